//! Web接口模块
//!
//! 提供触发探测周期的接口以及目标登记、评价和统计的 JSON 接口

use crate::error::{ApiVitalsError, StoreError};
use crate::pinger::FanOutScheduler;
use crate::store::RegistryStore;
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::CronSecret;
pub use server::WebServer;

/// Web应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 目标与评价存储
    pub store: Arc<dyn RegistryStore>,
    /// 探测调度器
    pub scheduler: FanOutScheduler,
    /// 触发密钥，未配置时拒绝所有触发请求
    pub cron_secret: Option<CronSecret>,
    /// 启动时间
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(
        store: Arc<dyn RegistryStore>,
        scheduler: FanOutScheduler,
        cron_secret: Option<CronSecret>,
    ) -> Self {
        Self {
            store,
            scheduler,
            cron_secret,
            start_time: chrono::Utc::now(),
        }
    }
}

/// API错误响应，响应体为 `{code, message}`
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// 错误代码（HTTP 状态码）
    pub code: u16,
    /// 错误消息
    pub message: String,
}

impl ApiError {
    /// 创建新的API错误
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "未授权")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "服务器内部错误")
    }

    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownTarget(_) => Self::not_found("目标 API 不存在"),
            StoreError::DuplicateUrl(_) => Self::new(StatusCode::CONFLICT, "该 API 地址已被登记"),
            StoreError::Database(message) => {
                error!("数据库错误: {}", message);
                Self::internal()
            }
        }
    }
}

impl From<ApiVitalsError> for ApiError {
    fn from(err: ApiVitalsError) -> Self {
        match err {
            ApiVitalsError::Validation(e) => Self::bad_request(e.to_string()),
            ApiVitalsError::Store(e) => e.into(),
            other => {
                error!("请求处理失败: {}", other);
                Self::internal()
            }
        }
    }
}

/// 健康检查响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 版本信息
    pub version: String,
    /// 运行时间
    pub uptime_seconds: u64,
}

/// 创建路由
pub fn create_router(state: AppState, cors_enabled: bool) -> Router {
    let trigger_routes = Router::new()
        .route(
            "/api/cron/ping",
            get(handlers::trigger_cycle).post(handlers::trigger_cycle),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_cron_secret,
        ));

    let router = Router::new()
        .route("/api/list", get(handlers::list_apis))
        .route("/api/stats/{id}", get(handlers::api_stats))
        .route("/api/submit", post(handlers::submit_api))
        .route("/api/review", post(handlers::submit_review))
        .route("/api/test-db", get(handlers::test_db))
        .route("/api/health", get(handlers::health))
        .merge(trigger_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
