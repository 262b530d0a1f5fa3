//! 日志系统模块
//!
//! 提供结构化日志配置和管理功能

use crate::pinger::{CycleSummary, ProbeOutcome};
use log::LevelFilter;
use serde_json::json;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化失败时的错误信息
    init_error: Option<String>,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

fn lock_state() -> MutexGuard<'static, GlobalLoggingState> {
    GLOBAL_LOGGING_STATE
        .get_or_init(|| Mutex::new(GlobalLoggingState::default()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径，设置后日志写入该文件而不是控制台
    pub file_path: Option<PathBuf>,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// 根据配置文件中的级别字符串构造日志配置
    pub fn from_level_str(level: &str) -> Self {
        let level = match level.to_ascii_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        };
        Self {
            level,
            ..Default::default()
        }
    }

    /// 设置输出格式与日志文件
    pub fn with_output(mut self, json_format: bool, file_path: Option<PathBuf>) -> Self {
        self.json_format = json_format;
        self.file_path = file_path;
        self
    }
}

/// 日志系统管理器
#[derive(Debug, Clone)]
pub struct LoggingSystem {
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 同一进程内只会真正初始化一次，之后的调用直接返回新的实例
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        Self::setup_logging_with_options(config, false)
    }

    /// 初始化日志系统（带选项）
    ///
    /// # 参数
    /// * `config` - 日志配置
    /// * `force_reinit` - 是否强制重新初始化（主要用于测试）
    pub fn setup_logging_with_options(
        config: LogConfig,
        force_reinit: bool,
    ) -> anyhow::Result<Self> {
        {
            let state = lock_state();
            if state.initialized && !force_reinit {
                return match &state.init_error {
                    None => Ok(Self { config }),
                    Some(e) => Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e)),
                };
            }
        }

        let init_result = Self::perform_initialization(&config);

        {
            let mut state = lock_state();
            state.initialized = true;
            state.init_error = init_result.as_ref().err().map(|e| e.to_string());
        }

        init_result?;
        Ok(Self { config })
    }

    /// 执行实际的日志系统初始化
    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        Self::init_log_tracer()?;
        Self::init_tracing_subscriber(config)?;
        Ok(())
    }

    /// 初始化 LogTracer（log crate 到 tracing 的桥接）
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));

        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let mut env_filter =
            EnvFilter::from_default_env().add_directive(Self::convert_level_to_directive(config.level));

        // sqlx 每条语句都会打日志，默认压到 warn
        if let Ok(directive) = "sqlx=warn".parse() {
            env_filter = env_filter.add_directive(directive);
        }

        let fmt_layer = match &config.file_path {
            Some(file_path) => {
                // 文件输出（追加写入，不包含轮转）
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(file_path)
                    .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?;
                let writer = Mutex::new(file);

                if config.json_format {
                    fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_timer(fmt::time::ChronoUtc::rfc_3339())
                        .with_file(true)
                        .with_line_number(true)
                        .boxed()
                } else {
                    fmt::layer()
                        .with_writer(writer)
                        .with_timer(fmt::time::ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true)
                        .boxed()
                }
            }
            None if config.json_format => fmt::layer()
                .json()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            None => fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_target(true)
                .with_line_number(true)
                .boxed(),
        };

        let result = registry().with(env_filter).with(fmt_layer).try_init();

        match result {
            Ok(()) => {
                tracing::debug!("日志系统初始化完成: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains(
                    "attempted to set a logger after the logging system was already initialized",
                ) || error_msg.contains("a global default trace dispatcher has already been set")
                {
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!(
                        "tracing subscriber初始化失败: {}",
                        error_msg
                    ))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        match level {
            LevelFilter::Off => Directive::from(TracingLevel::OFF),
            LevelFilter::Error => Directive::from(tracing::Level::ERROR),
            LevelFilter::Warn => Directive::from(tracing::Level::WARN),
            LevelFilter::Info => Directive::from(tracing::Level::INFO),
            LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
            LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
        }
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        if GLOBAL_LOGGING_STATE.get().is_some() {
            let mut state = lock_state();
            state.initialized = false;
            state.init_error = None;
        }
    }

    /// 当前实例使用的配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }
}

/// 记录单次探测结果
pub fn probe_log(json_format: bool, target_name: &str, outcome: &ProbeOutcome) {
    tracing::info!("{}", format_probe_entry(json_format, target_name, outcome));
}

/// 记录一次探测周期的汇总
pub fn cycle_log(json_format: bool, summary: &CycleSummary) {
    tracing::info!("{}", format_cycle_entry(json_format, summary));
}

/// 格式化单次探测日志
pub fn format_probe_entry(json_format: bool, target_name: &str, outcome: &ProbeOutcome) -> String {
    let status = if outcome.is_transport_failure() {
        "unreachable"
    } else {
        "reachable"
    };

    if json_format {
        json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "type": "probe",
            "target": target_name,
            "status": status,
            "status_code": outcome.status_code,
            "latency_ms": outcome.latency_ms,
        })
        .to_string()
    } else {
        format!(
            "PROBE: {} - {} (status {}, {}ms)",
            target_name, status, outcome.status_code, outcome.latency_ms
        )
    }
}

/// 格式化探测周期汇总日志
pub fn format_cycle_entry(json_format: bool, summary: &CycleSummary) -> String {
    if json_format {
        json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "type": "cycle",
            "targets": summary.targets,
            "recorded": summary.recorded,
            "transport_failures": summary.transport_failures,
            "persist_failures": summary.persist_failures,
            "elapsed_ms": summary.elapsed.as_millis() as u64,
        })
        .to_string()
    } else {
        format!(
            "CYCLE: {} targets, {} recorded, {} unreachable, {} persist failures ({}ms)",
            summary.targets,
            summary.recorded,
            summary.transport_failures,
            summary.persist_failures,
            summary.elapsed.as_millis()
        )
    }
}
