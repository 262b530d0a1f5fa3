//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换和错误处理功能

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "api-vitals.toml";

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    ///
    /// # 参数
    /// * `content` - 配置文件内容
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的 `${VAR}` 环境变量，变量未设置时返回错误
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    /// 解析TOML内容
    fn parse_toml(&self, content: &str) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let config: Config = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {}", e)))?;

        Ok(config)
    }

    /// 加载配置文件；默认路径下的文件不存在时使用默认配置
    ///
    /// # 参数
    /// * `explicit_path` - 用户显式指定的配置文件路径
    ///
    /// # 返回
    /// * `Result<(Config, PathBuf)>` - 配置及其来源路径
    pub async fn load_or_default(&self, explicit_path: Option<&Path>) -> Result<(Config, PathBuf)> {
        match explicit_path {
            Some(path) => Ok((self.load_from_file(path).await?, path.to_path_buf())),
            None => {
                let path = get_default_config_path();
                if path.exists() {
                    Ok((self.load_from_file(&path).await?, path))
                } else {
                    tracing::info!("未找到配置文件 {}，使用默认配置", path.display());
                    Ok((Config::default(), path))
                }
            }
        }
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {}", e)))?;

        let config = self.parse_toml(&content)?;
        self.validate(&config)?;

        log::info!("成功加载配置文件: {}", path.display());
        log::debug!("配置内容: {:?}", config);

        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse_toml(content)?;
        self.validate(&config)?;

        log::debug!("成功解析配置字符串");

        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 获取默认配置文件路径
///
/// 当前目录存在 `api-vitals.toml` 时优先使用，否则使用用户配置目录下的
/// `api-vitals/config.toml`
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join("api-vitals").join("config.toml"))
        .unwrap_or(local)
}

/// 示例配置文件内容
pub const SAMPLE_CONFIG: &str = r#"# api-vitals 配置文件

[global]
# SQLite 数据库地址
database_url = "sqlite://api-vitals.db"
# 单次探测超时（毫秒）
probe_timeout_ms = 10000
# 同时进行中的探测数量上限（可选，不设置则不限制）
# max_concurrent_probes = 32
# 进程内定时触发间隔（秒，可选，不设置则只依赖外部触发）
# cycle_interval_seconds = 300
log_level = "info"
# 日志文件路径（可选，不设置则输出到控制台）
# log_file = "api-vitals.log"

[web]
bind_address = "0.0.0.0"
port = 8080
# 触发探测周期的共享密钥，请求头需携带 Authorization: Bearer <密钥>
# 也可以通过环境变量 CRON_SECRET 或 --cron-secret 参数提供
# cron_secret = "change-me"
cors_enabled = true
"#;
