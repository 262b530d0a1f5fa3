//! HTTP 探测执行器
//!
//! 对目标地址发起一次 GET 请求，并把结果折算为延迟/状态码

use super::outcome::{ProbeOutcome, TransportFailure};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// 默认探测超时
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// 探测执行器trait
///
/// 实现必须是全函数：任何失败都折算为哨兵结果，不向外返回错误
#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    /// 探测一次目标地址
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// 基于 reqwest 的探测执行器
#[derive(Debug, Clone)]
pub struct HttpProbeExecutor {
    /// HTTP客户端（连接池）
    client: Client,
    /// 探测超时时间
    timeout: Duration,
}

impl HttpProbeExecutor {
    /// 使用外部构造的客户端创建执行器
    ///
    /// # 参数
    /// * `client` - HTTP客户端
    /// * `timeout` - 探测超时时间
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// 构造探测用的 HTTP 客户端
    ///
    /// # 参数
    /// * `timeout` - 请求超时时间
    /// * `user_agent` - 自定义 User-Agent，不设置时使用 `api-vitals/<版本>`
    pub fn build_client(timeout: Duration, user_agent: Option<&str>) -> reqwest::Result<Client> {
        let user_agent = user_agent
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/{}", crate::APP_NAME, crate::VERSION));

        Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
    }

    /// 按超时时间构造客户端和执行器
    pub fn with_timeout(timeout: Duration, user_agent: Option<&str>) -> reqwest::Result<Self> {
        Ok(Self::new(Self::build_client(timeout, user_agent)?, timeout))
    }

    /// 探测超时时间
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ProbeExecutor for HttpProbeExecutor {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let start_time = Instant::now();

        // 不按状态码判定失败，只要收到响应就记录真实状态码
        match timeout(self.timeout, self.client.get(url).send()).await {
            Ok(Ok(response)) => {
                let latency_ms = start_time.elapsed().as_millis() as u64;
                let status_code = response.status().as_u16();
                debug!("探测完成: {} -> {} ({}ms)", url, status_code, latency_ms);
                ProbeOutcome::reachable(status_code, latency_ms)
            }
            Ok(Err(e)) => {
                let kind = TransportFailure::classify(&e);
                warn!("探测失败: {} - {}: {}", url, kind, e);
                ProbeOutcome::transport_failure()
            }
            Err(_) => {
                warn!(
                    "探测失败: {} - {}: 超过 {}ms",
                    url,
                    TransportFailure::Timeout,
                    self.timeout.as_millis()
                );
                ProbeOutcome::transport_failure()
            }
        }
    }
}
