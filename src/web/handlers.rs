//! Web 路由处理函数

use super::{ApiError, AppState, HealthResponse};
use crate::registry::{self, ReviewSubmission, TargetSubmission};
use crate::stats::{self, ApiDetails, ApiListing};
use crate::store::{Review, Target};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

type ApiResult<T> = Result<T, ApiError>;

/// 触发一个探测周期，周期完成后返回
pub async fn trigger_cycle(State(state): State<AppState>) -> Json<Value> {
    let summary = state.scheduler.run_from_store(state.store.as_ref()).await;
    tracing::debug!("触发的探测周期完成: {:?}", summary);
    Json(json!({ "success": true }))
}

/// 全部目标列表，最新登记的在前
pub async fn list_apis(State(state): State<AppState>) -> ApiResult<Json<Vec<ApiListing>>> {
    let listings = stats::load_listings(state.store.as_ref()).await?;
    Ok(Json(listings))
}

/// 单个目标的详情
pub async fn api_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiDetails>> {
    stats::load_details(state.store.as_ref(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("目标 API 不存在"))
}

/// 登记新目标
pub async fn submit_api(
    State(state): State<AppState>,
    payload: Result<Json<TargetSubmission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Target>)> {
    let Json(submission) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let target = registry::submit_target(state.store.as_ref(), submission).await?;
    Ok((StatusCode::CREATED, Json(target)))
}

/// 提交评价
pub async fn submit_review(
    State(state): State<AppState>,
    payload: Result<Json<ReviewSubmission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let Json(submission) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let review = registry::submit_review(state.store.as_ref(), submission).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// 数据库连通性检查
pub async fn test_db(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.store.ping().await?;
    Ok(Json(json!({ "status": "Connected!" })))
}

/// 存活检查
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = chrono::Utc::now() - state.start_time;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
    })
}
