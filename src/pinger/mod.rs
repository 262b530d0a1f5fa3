//! 探测模块
//!
//! 包含探测执行器、结果记录器和扇出调度器

pub mod executor;
pub mod outcome;
pub mod recorder;
pub mod scheduler;

// 重新导出主要类型
pub use executor::{HttpProbeExecutor, ProbeExecutor, DEFAULT_PROBE_TIMEOUT};
pub use outcome::{ProbeOutcome, TransportFailure, SENTINEL_LATENCY_MS, SENTINEL_STATUS_CODE};
pub use recorder::{ResultRecorder, StoreRecorder};
pub use scheduler::{CycleSummary, FanOutScheduler};
