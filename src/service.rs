//! 服务管理模块
//!
//! 负责配置加载、组件初始化、Web服务与定时触发的生命周期管理

use crate::cli::args::Args;
use crate::config::{validate_config, Config, TomlConfigLoader};
use crate::error::{ApiVitalsError, ConfigError, Result};
use crate::pinger::{FanOutScheduler, HttpProbeExecutor, StoreRecorder};
use crate::store::{RegistryStore, SqliteStore};
use crate::web::{create_router, AppState, CronSecret, WebServer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// 服务组件集合
pub struct ServiceComponents {
    /// 目标、样本与评价存储
    pub store: Arc<SqliteStore>,
    /// 扇出调度器
    pub scheduler: FanOutScheduler,
}

impl ServiceComponents {
    /// 存储的 trait 对象视图
    pub fn registry(&self) -> Arc<dyn RegistryStore> {
        self.store.clone()
    }
}

/// 服务启动器
pub struct ServiceLauncher;

impl ServiceLauncher {
    /// 加载配置并应用命令行覆盖项
    ///
    /// 显式指定的配置文件不存在时返回错误；默认路径下没有配置文件时使用默认配置
    pub async fn load_config(args: &Args) -> Result<Config> {
        let loader = TomlConfigLoader::new(true);
        let (mut config, source) = loader.load_or_default(args.config.as_deref()).await?;
        args.apply_overrides(&mut config);
        validate_config(&config).map_err(ConfigError::ValidationError)?;

        info!("配置加载完成: {}", source.display());
        Ok(config)
    }

    /// 初始化存储、探测执行器、记录器和调度器
    pub async fn initialize_components(config: &Config, json_logs: bool) -> Result<ServiceComponents> {
        info!("初始化服务组件...");

        let store = Arc::new(SqliteStore::connect(&config.global.database_url).await?);

        let executor = HttpProbeExecutor::with_timeout(
            config.global.probe_timeout(),
            config.global.user_agent.as_deref(),
        )
        .map_err(|e| ApiVitalsError::Other(anyhow::anyhow!("创建HTTP客户端失败: {}", e)))?;

        let registry: Arc<dyn RegistryStore> = store.clone();
        let scheduler = FanOutScheduler::new(
            Arc::new(executor),
            Arc::new(StoreRecorder::new(registry)),
        )
        .with_concurrency_limit(config.global.max_concurrent_probes)
        .with_json_logs(json_logs);

        Ok(ServiceComponents { store, scheduler })
    }

    /// 运行Web服务，直到收到退出信号
    ///
    /// 配置了 `cycle_interval_seconds` 时同时启动进程内定时触发
    pub async fn run_server(config: &Config, components: ServiceComponents) -> Result<()> {
        let (shutdown_tx, _) = broadcast::channel(1);

        let cron_secret = CronSecret::from_optional(config.web.cron_secret.as_deref());
        if cron_secret.is_none() {
            warn!("未配置触发密钥，所有触发请求都将被拒绝");
        }

        let state = AppState::new(components.registry(), components.scheduler.clone(), cron_secret);
        let router = create_router(state, config.web.cors_enabled);

        let addr = config
            .web
            .socket_addr()
            .map_err(ConfigError::ValidationError)?;
        let server = WebServer::bind(addr, router, shutdown_tx.subscribe()).await?;

        let trigger_handle = config.global.cycle_interval_seconds.map(|secs| {
            spawn_interval_trigger(
                components.scheduler.clone(),
                components.registry(),
                Duration::from_secs(secs),
                shutdown_tx.subscribe(),
            )
        });

        let signal_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("收到退出信号，正在停止服务...");
            let _ = signal_tx.send(());
        });

        let server_result = server.run().await;

        // 服务器异常退出时同样需要停止定时触发
        let _ = shutdown_tx.send(());
        if let Some(handle) = trigger_handle {
            if let Err(e) = handle.await {
                error!("定时触发任务异常退出: {}", e);
            }
        }

        components.store.close().await;
        info!("服务已停止");
        server_result
    }
}

/// 启动进程内定时触发任务
///
/// 每个间隔执行一次探测周期；上一个周期未结束时下一次触发顺延
pub fn spawn_interval_trigger(
    scheduler: FanOutScheduler,
    store: Arc<dyn RegistryStore>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("启动定时探测任务，间隔: {}秒", period.as_secs());

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    scheduler.run_from_store(store.as_ref()).await;
                }
                _ = shutdown_rx.recv() => {
                    info!("定时探测任务已停止");
                    break;
                }
            }
        }
    })
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("监听中断信号失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("监听 SIGTERM 失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
