//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// 探测超时上限（毫秒），必须小于哨兵延迟值
pub const MAX_PROBE_TIMEOUT_MS: u64 = 60_000;

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// Web 服务器配置
    #[serde(default)]
    pub web: WebConfig,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 数据库连接地址
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// 单次探测超时时间（毫秒）
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// 同时进行中的探测数量上限，不设置则不限制
    #[serde(default)]
    pub max_concurrent_probes: Option<usize>,
    /// 进程内定时触发间隔（秒），不设置则只依赖外部触发
    #[serde(default)]
    pub cycle_interval_seconds: Option<u64>,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 日志文件路径，不设置则输出到控制台
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// 探测请求使用的 User-Agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            probe_timeout_ms: default_probe_timeout_ms(),
            max_concurrent_probes: None,
            cycle_interval_seconds: None,
            log_level: default_log_level(),
            log_file: None,
            user_agent: None,
        }
    }
}

impl GlobalConfig {
    /// 探测超时时间
    pub fn probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Web 服务器配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebConfig {
    /// 绑定地址
    #[serde(default = "default_web_bind_address")]
    pub bind_address: String,
    /// 监听端口
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// 触发探测周期所需的共享密钥
    #[serde(default)]
    pub cron_secret: Option<String>,
    /// 是否启用 CORS
    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: default_web_bind_address(),
            port: default_web_port(),
            cron_secret: None,
            cors_enabled: default_cors_enabled(),
        }
    }
}

impl WebConfig {
    /// 解析监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| format!("无效的监听地址 {}:{}: {}", self.bind_address, self.port, e))
    }
}

// 默认值函数
fn default_database_url() -> String {
    "sqlite://api-vitals.db".to_string()
}
fn default_probe_timeout_ms() -> u64 {
    crate::pinger::DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_web_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_web_port() -> u16 {
    8080
}
fn default_cors_enabled() -> bool {
    true
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    let global = &config.global;

    if global.database_url.trim().is_empty() {
        return Err("数据库地址不能为空".to_string());
    }

    if !global.database_url.starts_with("sqlite:") {
        return Err(format!(
            "不支持的数据库地址: {}，仅支持 sqlite: 开头的地址",
            global.database_url
        ));
    }

    if global.probe_timeout_ms == 0 {
        return Err("探测超时时间不能为0".to_string());
    }

    if global.probe_timeout_ms > MAX_PROBE_TIMEOUT_MS {
        return Err(format!(
            "探测超时时间不能超过 {} 毫秒",
            MAX_PROBE_TIMEOUT_MS
        ));
    }

    if global.max_concurrent_probes == Some(0) {
        return Err("最大并发探测数不能为0".to_string());
    }

    if global.cycle_interval_seconds == Some(0) {
        return Err("探测周期间隔不能为0".to_string());
    }

    // 验证日志级别
    let valid_log_levels = ["debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            global.log_level, valid_log_levels
        ));
    }

    // 验证Web配置
    if config.web.port == 0 {
        return Err("无效的Web服务器端口: 0，端口不能为0".to_string());
    }

    if config.web.bind_address.is_empty() {
        return Err("Web服务器绑定地址不能为空".to_string());
    }

    if let Some(secret) = &config.web.cron_secret {
        if secret.trim().is_empty() {
            return Err("触发密钥不能为空字符串".to_string());
        }
    }

    Ok(())
}
