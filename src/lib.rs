//! API Vitals - 第三方 HTTP API 延迟与可用性探测服务
//!
//! 这是一个用Rust编写的 API 探测与评价服务，支持：
//! - 对已登记的 API 并发探测并记录延迟与状态码
//! - 共享密钥保护的周期触发接口
//! - 目标登记、评价提交与聚合统计
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pinger;
pub mod registry;
pub mod service;
pub mod stats;
pub mod store;
pub mod web;

// 重新导出主要类型
pub use config::{Config, GlobalConfig, WebConfig};
pub use error::ApiVitalsError;
pub use pinger::{CycleSummary, FanOutScheduler, ProbeOutcome};
pub use store::{RegistryStore, SqliteStore};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
