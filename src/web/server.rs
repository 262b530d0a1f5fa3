//! Web服务器实现
//!
//! 基于 axum 的 HTTP 服务器，收到关闭信号后优雅退出

use crate::error::Result;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

/// Web服务器
pub struct WebServer {
    listener: TcpListener,
    router: Router,
    shutdown_rx: broadcast::Receiver<()>,
}

impl WebServer {
    /// 绑定监听地址
    ///
    /// # 参数
    /// * `addr` - 监听地址，端口为 0 时由系统分配
    /// * `router` - 路由
    /// * `shutdown_rx` - 关闭信号接收器
    pub async fn bind(
        addr: SocketAddr,
        router: Router,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            router,
            shutdown_rx,
        })
    }

    /// 实际监听的地址
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// 运行服务器直到收到关闭信号
    pub async fn run(self) -> Result<()> {
        let Self {
            listener,
            router,
            mut shutdown_rx,
        } = self;

        info!("Web服务器已启动: http://{}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("接收到关闭信号，正在关闭Web服务器...");
            })
            .await?;

        info!("Web服务器已关闭");
        Ok(())
    }
}
