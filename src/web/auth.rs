//! 认证模块
//!
//! 触发接口使用 `Authorization: Bearer <密钥>` 认证，密钥比较为常数时间

use super::{ApiError, AppState};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Bearer 前缀
pub const BEARER_PREFIX: &str = "Bearer ";

/// 计算标签时使用的固定消息
const TAG_MESSAGE: &[u8] = b"api-vitals/cron-trigger";

/// 触发密钥
///
/// 以密钥为 HMAC key 对固定消息计算标签，比较标签而不是直接比较字符串
#[derive(Clone)]
pub struct CronSecret {
    expected_tag: Arc<[u8]>,
}

impl fmt::Debug for CronSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CronSecret(***)")
    }
}

fn keyed_mac(key: &str) -> Option<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes()).ok()?;
    mac.update(TAG_MESSAGE);
    Some(mac)
}

impl CronSecret {
    /// 创建触发密钥
    pub fn new(secret: &str) -> Option<Self> {
        let tag = keyed_mac(secret)?.finalize().into_bytes();
        Some(Self {
            expected_tag: Arc::from(tag.as_slice()),
        })
    }

    /// 去掉空白后为空的密钥视为未配置
    pub fn from_optional(secret: Option<&str>) -> Option<Self> {
        secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(Self::new)
    }

    /// 常数时间比较
    pub fn verify(&self, provided: &str) -> bool {
        keyed_mac(provided)
            .map(|mac| mac.verify_slice(&self.expected_tag).is_ok())
            .unwrap_or(false)
    }
}

/// 从请求头中取出 Bearer 令牌
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
}

/// 触发接口认证中间件
pub async fn require_cron_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = match (&state.cron_secret, bearer_token(request.headers())) {
        (None, _) => {
            warn!("未配置触发密钥，拒绝触发请求");
            false
        }
        (Some(_), None) => {
            warn!("触发请求缺少 Bearer 令牌");
            false
        }
        (Some(secret), Some(token)) => {
            let ok = secret.verify(token);
            if !ok {
                warn!("触发请求密钥不匹配");
            }
            ok
        }
    };

    if !authorized {
        return ApiError::unauthorized().into_response();
    }

    next.run(request).await
}
