//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config::Config;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// api-vitals - 第三方 API 延迟与可用性探测服务
#[derive(Parser, Debug, Clone)]
#[command(
    name = "api-vitals",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "API_VITALS_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别，不指定时使用配置文件中的级别
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "API_VITALS_LOG_LEVEL"
    )]
    pub log_level: Option<LogLevel>,

    /// 是否输出JSON格式日志
    #[arg(long, help = "输出JSON格式日志")]
    pub json_logs: bool,

    /// 日志文件路径，覆盖配置文件
    #[arg(
        long,
        value_name = "FILE",
        help = "日志文件路径",
        env = "API_VITALS_LOG_FILE"
    )]
    pub log_file: Option<PathBuf>,

    /// 数据库地址，覆盖配置文件
    #[arg(long, value_name = "URL", help = "数据库地址", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// 触发密钥，覆盖配置文件
    #[arg(
        long,
        value_name = "SECRET",
        help = "触发探测周期的共享密钥",
        env = "CRON_SECRET",
        hide_env_values = true
    )]
    pub cron_secret: Option<String>,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 启动HTTP服务
    Serve {
        /// 监听端口
        #[arg(short, long, value_name = "PORT", help = "监听端口")]
        port: Option<u16>,

        /// 进程内定时触发间隔（秒）
        #[arg(
            short,
            long,
            value_name = "SECONDS",
            help = "进程内定时触发间隔（秒）",
            env = "API_VITALS_INTERVAL"
        )]
        interval: Option<u64>,
    },

    /// 对全部已登记目标执行一次探测周期
    Ping {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 列出已登记目标及统计
    List {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            short,
            long,
            value_name = "FILE",
            help = "配置文件路径",
            default_value = crate::config::loader::DEFAULT_CONFIG_FILE
        )]
        path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 验证配置文件
    Validate {
        /// 是否显示详细信息
        #[arg(short, long, help = "显示详细信息")]
        verbose: bool,
    },
}

impl Commands {
    /// 该命令执行前是否需要加载配置
    pub fn needs_config(&self) -> bool {
        !matches!(self, Commands::Init { .. } | Commands::Validate { .. })
    }
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 将命令行与环境变量覆盖项应用到配置
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(database_url) = &self.database_url {
            config.global.database_url = database_url.clone();
        }
        if let Some(secret) = &self.cron_secret {
            config.web.cron_secret = Some(secret.clone());
        }
        if let Some(level) = &self.log_level {
            config.global.log_level = level.to_string();
        }
        if let Some(log_file) = &self.log_file {
            config.global.log_file = Some(log_file.clone());
        }
    }
}
