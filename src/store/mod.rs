//! 目标与评价存储模块
//!
//! 定义存储接口，并提供基于 SQLite 的实现

pub mod models;
pub mod sqlite;

pub use models::{NewReview, NewSample, NewTarget, PerformanceSample, Review, SortOrder, Target};
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use async_trait::async_trait;

/// 存储层结果类型
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 目标、探测样本与评价的存储接口
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// 列出全部目标，最新登记的在前
    async fn list_targets(&self) -> StoreResult<Vec<Target>>;

    /// 按ID获取目标
    async fn get_target(&self, id: &str) -> StoreResult<Option<Target>>;

    /// 登记新目标，URL 重复时返回 `StoreError::DuplicateUrl`
    async fn insert_target(&self, target: NewTarget) -> StoreResult<Target>;

    /// 追加一条探测样本，目标不存在时返回 `StoreError::UnknownTarget`
    async fn insert_sample(&self, sample: NewSample) -> StoreResult<PerformanceSample>;

    /// 按时间顺序列出目标的探测样本
    async fn list_samples(
        &self,
        target_id: &str,
        order: SortOrder,
    ) -> StoreResult<Vec<PerformanceSample>>;

    /// 按时间顺序列出目标的评价
    async fn list_reviews(&self, target_id: &str, order: SortOrder) -> StoreResult<Vec<Review>>;

    /// 新增评价，目标不存在时返回 `StoreError::UnknownTarget`
    async fn insert_review(&self, review: NewReview) -> StoreResult<Review>;

    /// 连通性检查
    async fn ping(&self) -> StoreResult<()>;
}
