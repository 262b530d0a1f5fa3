//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::loader::SAMPLE_CONFIG;
use crate::config::{get_default_config_path, Config, ConfigLoader, TomlConfigLoader};
use crate::error::{ConfigError, Result};
use crate::pinger::CycleSummary;
use crate::service::ServiceLauncher;
use crate::stats::{self, ApiListing};
use async_trait::async_trait;
use std::path::Path;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 启动HTTP服务命令
pub struct ServeCommand {
    config: Config,
}

impl ServeCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Command for ServeCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let mut config = self.config.clone();

        if let Commands::Serve { port, interval } = &args.command {
            if let Some(port) = port {
                config.web.port = *port;
            }
            if interval.is_some() {
                config.global.cycle_interval_seconds = *interval;
            }
        }
        crate::config::validate_config(&config).map_err(ConfigError::ValidationError)?;

        let components = ServiceLauncher::initialize_components(&config, args.json_logs).await?;
        ServiceLauncher::run_server(&config, components).await
    }
}

/// 执行一次探测周期命令
pub struct PingCommand {
    config: Config,
}

impl PingCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Command for PingCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let components =
            ServiceLauncher::initialize_components(&self.config, args.json_logs).await?;
        let summary = components
            .scheduler
            .run_from_store(components.store.as_ref())
            .await;
        components.store.close().await;

        let format = match &args.command {
            Commands::Ping { format } => format.clone(),
            _ => OutputFormat::Text,
        };
        println!("{}", render_summary(&summary, &format)?);
        Ok(())
    }
}

/// 列出目标命令
pub struct ListCommand {
    config: Config,
}

impl ListCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Command for ListCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let store = crate::store::SqliteStore::connect(&self.config.global.database_url).await?;
        let listings = stats::load_listings(&store).await;
        store.close().await;
        let listings = listings?;

        let format = match &args.command {
            Commands::List { format } => format.clone(),
            _ => OutputFormat::Text,
        };
        println!("{}", render_listings(&listings, &format)?);
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { path, force } = &args.command {
            self.create_config_file(path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 写入示例配置文件
    async fn create_config_file(&self, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            println!("配置文件已存在: {}", path.display());
            println!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(path, SAMPLE_CONFIG).await?;

        println!("✓ 配置文件已创建: {}", path.display());
        println!("请通过环境变量 CRON_SECRET、--cron-secret 参数或 [web].cron_secret 配置触发密钥");
        Ok(())
    }
}

/// 验证配置命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let verbose = matches!(args.command, Commands::Validate { verbose: true });
        let loader = TomlConfigLoader::new(true);

        let config_path = args.config.clone().unwrap_or_else(get_default_config_path);
        println!("验证配置文件: {}", config_path.display());

        let mut config = loader.load_from_file(&config_path).await?;
        args.apply_overrides(&mut config);
        loader.validate(&config)?;

        println!("✓ 配置文件格式正确");
        println!("✓ 数据库地址: {}", config.global.database_url);
        println!("✓ 探测超时: {}ms", config.global.probe_timeout_ms);
        match config.web.cron_secret {
            Some(_) => println!("✓ 已配置触发密钥"),
            None => println!("! 未配置触发密钥，触发接口将拒绝所有请求"),
        }

        if verbose {
            println!();
            println!("监听地址: {}:{}", config.web.bind_address, config.web.port);
            match config.global.max_concurrent_probes {
                Some(limit) => println!("最大并发探测数: {}", limit),
                None => println!("最大并发探测数: 不限制"),
            }
            match config.global.cycle_interval_seconds {
                Some(secs) => println!("定时触发间隔: {}秒", secs),
                None => println!("定时触发间隔: 未启用"),
            }
            println!("日志级别: {}", config.global.log_level);
            match &config.global.log_file {
                Some(path) => println!("日志文件: {}", path.display()),
                None => println!("日志文件: 控制台输出"),
            }
        }

        Ok(())
    }
}

/// 格式化探测周期摘要
pub fn render_summary(summary: &CycleSummary, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
            "targets": summary.targets,
            "recorded": summary.recorded,
            "transportFailures": summary.transport_failures,
            "persistFailures": summary.persist_failures,
            "elapsedMs": summary.elapsed.as_millis() as u64,
        }))?),
        OutputFormat::Text => Ok(format!(
            "探测完成: {} 个目标，记录 {} 条，不可达 {} 个，写入失败 {} 个，耗时 {}ms",
            summary.targets,
            summary.recorded,
            summary.transport_failures,
            summary.persist_failures,
            summary.elapsed.as_millis()
        )),
    }
}

/// 格式化目标列表
pub fn render_listings(listings: &[ApiListing], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(listings)?),
        OutputFormat::Text => {
            if listings.is_empty() {
                return Ok("暂无已登记的 API".to_string());
            }

            let mut lines = vec![format!(
                "{:<24} {:<8} {:<10} {:<8} {}",
                "名称", "评分", "延迟(ms)", "健康度", "地址"
            )];
            for listing in listings {
                let latency = listing
                    .latest_latency
                    .map(|ms| ms.to_string())
                    .unwrap_or_else(|| "-".to_string());
                lines.push(format!(
                    "{:<24} {:<8.1} {:<10} {:<8} {}",
                    listing.name,
                    listing.avg_rating,
                    latency,
                    format!("{:.1}%", listing.health_percentage),
                    listing.url
                ));
            }
            Ok(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    fn listing(name: &str, latency: Option<u64>) -> ApiListing {
        ApiListing {
            id: format!("{}-id", name),
            name: name.to_string(),
            url: format!("https://{}.example.com", name),
            avg_rating: 4.5,
            latest_latency: latency,
            total_reviews: 2,
            health_percentage: 66.7,
        }
    }

    #[test]
    fn test_render_summary_text() {
        let summary = CycleSummary {
            targets: 3,
            recorded: 2,
            transport_failures: 1,
            persist_failures: 1,
            elapsed: Duration::from_millis(120),
        };
        let text = render_summary(&summary, &OutputFormat::Text).unwrap();
        assert!(text.contains("3 个目标"));
        assert!(text.contains("写入失败 1 个"));

        let json = render_summary(&summary, &OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["recorded"], 2);
        assert_eq!(value["elapsedMs"], 120);
    }

    #[test]
    fn test_render_listings() {
        assert_eq!(
            render_listings(&[], &OutputFormat::Text).unwrap(),
            "暂无已登记的 API"
        );

        let text = render_listings(
            &[listing("alpha", Some(42)), listing("beta", None)],
            &OutputFormat::Text,
        )
        .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("alpha") && lines[1].contains("42"));
        assert!(lines[2].contains("66.7%"));

        let json = render_listings(&[listing("alpha", Some(42))], &OutputFormat::Json).unwrap();
        assert!(json.contains("\"latestLatency\": 42"));
    }

    #[tokio::test]
    async fn test_init_command_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("api-vitals.toml");
        let args = Args::try_parse_from([
            "api-vitals",
            "init",
            "--path",
            path.to_str().unwrap(),
        ])
        .unwrap();

        InitCommand.execute(&args).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, SAMPLE_CONFIG);

        // 已存在且未指定 --force 时保持原内容
        tokio::fs::write(&path, "# custom").await.unwrap();
        InitCommand.execute(&args).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "# custom");
    }

    #[tokio::test]
    async fn test_validate_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[global]\ndatabase_url = \"sqlite::memory:\"\n")
            .await
            .unwrap();

        let args = Args::try_parse_from([
            "api-vitals",
            "--config",
            path.to_str().unwrap(),
            "validate",
        ])
        .unwrap();
        assert!(ValidateCommand.execute(&args).await.is_ok());

        tokio::fs::write(&path, "[global]\nprobe_timeout_ms = 0\n")
            .await
            .unwrap();
        assert!(ValidateCommand.execute(&args).await.is_err());
    }

    #[tokio::test]
    async fn test_list_command_on_empty_store() {
        let mut config = Config::default();
        config.global.database_url = "sqlite::memory:".to_string();
        let args = Args::try_parse_from(["api-vitals", "list"]).unwrap();

        assert!(ListCommand::new(config).execute(&args).await.is_ok());
    }
}
