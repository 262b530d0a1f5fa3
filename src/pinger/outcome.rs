//! 探测结果类型
//!
//! 传输层失败统一折算为哨兵结果：状态码 0、延迟 99999 毫秒

use serde::{Deserialize, Serialize};
use std::fmt;

/// 无法测量时记录的延迟
pub const SENTINEL_LATENCY_MS: u64 = 99_999;

/// 传输层失败时记录的状态码
pub const SENTINEL_STATUS_CODE: u16 = 0;

/// 单次探测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    /// 从发起请求到收到响应头的耗时（毫秒）
    pub latency_ms: u64,
    /// 服务端返回的状态码
    pub status_code: u16,
}

impl ProbeOutcome {
    /// 收到了响应（任何状态码都算）
    pub fn reachable(status_code: u16, latency_ms: u64) -> Self {
        Self {
            latency_ms,
            status_code,
        }
    }

    /// 传输层失败
    pub fn transport_failure() -> Self {
        Self {
            latency_ms: SENTINEL_LATENCY_MS,
            status_code: SENTINEL_STATUS_CODE,
        }
    }

    /// 是否为哨兵结果
    pub fn is_transport_failure(&self) -> bool {
        self.status_code == SENTINEL_STATUS_CODE && self.latency_ms == SENTINEL_LATENCY_MS
    }

    /// 状态码是否落在 [200, 400)
    pub fn is_healthy(&self) -> bool {
        (200..400).contains(&self.status_code)
    }
}

/// 传输层失败的分类，仅用于日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// 超过探测超时
    Timeout,
    /// 连接失败
    Connect,
    /// 域名解析失败
    Dns,
    /// TLS 握手或证书错误
    Tls,
    /// 其他错误
    Other,
}

impl TransportFailure {
    /// 根据 reqwest 错误进行分类
    pub fn classify(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return TransportFailure::Timeout;
        }

        // reqwest 不单独暴露 DNS 与 TLS 错误，需要沿错误链查看描述
        let chain = error_chain(error).to_lowercase();
        if chain.contains("dns") || chain.contains("failed to lookup") {
            TransportFailure::Dns
        } else if chain.contains("certificate") || chain.contains("tls") || chain.contains("ssl")
        {
            TransportFailure::Tls
        } else if error.is_connect() {
            TransportFailure::Connect
        } else {
            TransportFailure::Other
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::Timeout => write!(f, "请求超时"),
            TransportFailure::Connect => write!(f, "连接失败"),
            TransportFailure::Dns => write!(f, "域名解析失败"),
            TransportFailure::Tls => write!(f, "TLS错误"),
            TransportFailure::Other => write!(f, "请求失败"),
        }
    }
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_outcome() {
        let outcome = ProbeOutcome::transport_failure();
        assert_eq!(outcome.status_code, 0);
        assert_eq!(outcome.latency_ms, 99_999);
        assert!(outcome.is_transport_failure());
        assert!(!outcome.is_healthy());
    }

    #[test]
    fn test_error_responses_are_not_sentinel() {
        let outcome = ProbeOutcome::reachable(503, 120);
        assert!(!outcome.is_transport_failure());
        assert!(!outcome.is_healthy());

        assert!(ProbeOutcome::reachable(301, 5).is_healthy());
        assert!(!ProbeOutcome::reachable(404, 5).is_healthy());
    }

    #[tokio::test]
    async fn test_classify_connect_error() {
        // 绑定后立即释放端口，保证连接被拒绝
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap_err();
        assert_eq!(TransportFailure::classify(&err), TransportFailure::Connect);
    }

    #[tokio::test]
    async fn test_classify_dns_error() {
        // .invalid 顶级域名保证无法解析
        let err = reqwest::Client::new()
            .get("http://api-vitals.invalid/")
            .send()
            .await
            .unwrap_err();
        assert_eq!(TransportFailure::classify(&err), TransportFailure::Dns);
        assert_eq!(TransportFailure::Dns.to_string(), "域名解析失败");
    }
}
