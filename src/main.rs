//! API Vitals 主程序入口
//!
//! 第三方 HTTP API 延迟与可用性探测服务

use anyhow::{Context, Result};
use api_vitals::cli::args::{Args, Commands};
use api_vitals::cli::commands::{
    Command, InitCommand, ListCommand, PingCommand, ServeCommand, ValidateCommand,
};
use api_vitals::config::Config;
use api_vitals::logging::{LogConfig, LoggingSystem};
use api_vitals::service::ServiceLauncher;
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 需要配置的命令先加载配置，日志级别未在命令行指定时取配置中的值
    let config = if args.command.needs_config() {
        Some(
            ServiceLauncher::load_config(&args)
                .await
                .context("加载配置失败")?,
        )
    } else {
        None
    };

    let level = match (&args.log_level, &config) {
        (Some(level), _) => level.clone().into(),
        (None, Some(config)) => LogConfig::from_level_str(&config.global.log_level).level,
        (None, None) => log::LevelFilter::Info,
    };
    let log_file = match &config {
        Some(config) => config.global.log_file.clone(),
        None => args.log_file.clone(),
    };

    let log_config = LogConfig {
        level,
        ..Default::default()
    }
    .with_output(args.json_logs, log_file);

    let logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("API Vitals v{} 启动", api_vitals::VERSION);
    if let Some(path) = &logging_system.config().file_path {
        info!("日志写入文件: {}", path.display());
    }

    // 执行命令
    if let Err(e) = execute_command(&args, config).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args, config: Option<Config>) -> Result<()> {
    let require_config = |config: Option<Config>| config.context("缺少配置");

    match &args.command {
        Commands::Serve { .. } => {
            let command = ServeCommand::new(require_config(config)?);
            command.execute(args).await?;
        }
        Commands::Ping { .. } => {
            let command = PingCommand::new(require_config(config)?);
            command.execute(args).await?;
        }
        Commands::List { .. } => {
            let command = ListCommand::new(require_config(config)?);
            command.execute(args).await?;
        }
        Commands::Init { .. } => InitCommand.execute(args).await?,
        Commands::Validate { .. } => ValidateCommand.execute(args).await?,
    }

    Ok(())
}
