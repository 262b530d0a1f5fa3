//! 存储层数据模型
//!
//! 定义目标、探测样本和评价的领域类型，JSON 字段统一使用 camelCase

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// 已登记的第三方 API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// 目标ID（UUID v4 字符串）
    pub id: String,
    /// 名称
    pub name: String,
    /// 探测地址
    pub url: String,
    /// 描述
    pub description: Option<String>,
    /// 登记时间
    pub created_at: DateTime<Utc>,
}

/// 一次探测的持久化样本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSample {
    /// 样本ID
    pub id: String,
    /// 所属目标ID
    #[serde(rename = "apiId")]
    pub target_id: String,
    /// 探测时间
    pub timestamp: DateTime<Utc>,
    /// 延迟（毫秒），无法测量时为哨兵值
    pub latency_ms: u64,
    /// HTTP 状态码，传输层失败时为 0
    pub status_code: u16,
}

/// 用户评价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// 评价ID
    pub id: String,
    /// 所属目标ID
    #[serde(rename = "apiId")]
    pub target_id: String,
    /// 评分（1-5）
    pub rating: u8,
    /// 评价内容，可能为空字符串
    pub text_content: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

/// 新目标
#[derive(Debug, Clone, PartialEq)]
pub struct NewTarget {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
}

/// 新探测样本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSample {
    pub target_id: String,
    pub latency_ms: u64,
    pub status_code: u16,
}

/// 新评价
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub target_id: String,
    pub rating: u8,
    pub text_content: String,
}

/// 按时间排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// 最早的在前
    Ascending,
    /// 最新的在前
    Descending,
}

impl SortOrder {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// 存储用时间格式：固定宽度的 RFC 3339 UTC（微秒），字典序即时间序
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
