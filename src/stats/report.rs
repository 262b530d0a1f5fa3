//! 列表与详情读模型

use super::aggregator::{
    average_rating, health_percentage, latest_latency, round_one_decimal,
};
use crate::store::{PerformanceSample, RegistryStore, Review, SortOrder, StoreResult, Target};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 列表页中的一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiListing {
    pub id: String,
    pub name: String,
    pub url: String,
    /// 平均评分，保留一位小数
    pub avg_rating: f64,
    /// 最近一次探测的延迟
    pub latest_latency: Option<u64>,
    pub total_reviews: usize,
    /// 健康占比，保留一位小数
    pub health_percentage: f64,
}

/// 详情页中的评价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub rating: u8,
    pub text_content: String,
    pub date_created: DateTime<Utc>,
}

impl From<Review> for ReviewEntry {
    fn from(review: Review) -> Self {
        Self {
            rating: review.rating,
            text_content: review.text_content,
            date_created: review.created_at,
        }
    }
}

/// 详情页中的一个延迟点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub latency_ms: u64,
    pub status_code: u16,
}

impl From<&PerformanceSample> for HistoryPoint {
    fn from(sample: &PerformanceSample) -> Self {
        Self {
            timestamp: sample.timestamp,
            latency_ms: sample.latency_ms,
            status_code: sample.status_code,
        }
    }
}

/// 单个目标的详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDetails {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub avg_rating: f64,
    pub total_reviews: usize,
    pub health_percentage: f64,
    /// 最新的在前
    pub reviews: Vec<ReviewEntry>,
    /// 最早的在前
    pub performance_history: Vec<HistoryPoint>,
}

impl ApiListing {
    /// 由目标及其评价、样本构造列表项
    pub fn build(target: Target, reviews: &[Review], samples: &[PerformanceSample]) -> Self {
        Self {
            id: target.id,
            name: target.name,
            url: target.url,
            avg_rating: round_one_decimal(average_rating(reviews)),
            latest_latency: latest_latency(samples),
            total_reviews: reviews.len(),
            health_percentage: round_one_decimal(health_percentage(samples)),
        }
    }
}

impl ApiDetails {
    /// 由目标、按时间倒序的评价和按时间正序的样本构造详情
    pub fn build(target: Target, reviews: Vec<Review>, samples: &[PerformanceSample]) -> Self {
        Self {
            id: target.id,
            name: target.name,
            url: target.url,
            description: target.description,
            avg_rating: round_one_decimal(average_rating(&reviews)),
            total_reviews: reviews.len(),
            health_percentage: round_one_decimal(health_percentage(samples)),
            reviews: reviews.into_iter().map(ReviewEntry::from).collect(),
            performance_history: samples.iter().map(HistoryPoint::from).collect(),
        }
    }
}

/// 加载全部目标的列表项，最新登记的在前
pub async fn load_listings(store: &dyn RegistryStore) -> StoreResult<Vec<ApiListing>> {
    let targets = store.list_targets().await?;
    let mut listings = Vec::with_capacity(targets.len());

    for target in targets {
        let reviews = store.list_reviews(&target.id, SortOrder::Descending).await?;
        let samples = store.list_samples(&target.id, SortOrder::Ascending).await?;
        listings.push(ApiListing::build(target, &reviews, &samples));
    }

    Ok(listings)
}

/// 加载单个目标的详情，目标不存在时返回 `None`
pub async fn load_details(store: &dyn RegistryStore, id: &str) -> StoreResult<Option<ApiDetails>> {
    let Some(target) = store.get_target(id).await? else {
        return Ok(None);
    };

    let reviews = store.list_reviews(&target.id, SortOrder::Descending).await?;
    let samples = store.list_samples(&target.id, SortOrder::Ascending).await?;
    Ok(Some(ApiDetails::build(target, reviews, &samples)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewReview, NewSample, NewTarget, SqliteStore};

    async fn seeded_store() -> (SqliteStore, Target) {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let target = store
            .insert_target(NewTarget {
                name: "Weather".to_string(),
                url: "https://weather.example.com".to_string(),
                description: Some("天气接口".to_string()),
            })
            .await
            .unwrap();

        for (latency, status) in [(120, 200), (99_999, 0), (80, 200)] {
            store
                .insert_sample(NewSample {
                    target_id: target.id.clone(),
                    latency_ms: latency,
                    status_code: status,
                })
                .await
                .unwrap();
        }
        for rating in [5, 3, 4] {
            store
                .insert_review(NewReview {
                    target_id: target.id.clone(),
                    rating,
                    text_content: String::new(),
                })
                .await
                .unwrap();
        }

        (store, target)
    }

    #[tokio::test]
    async fn test_load_listings() {
        let (store, target) = seeded_store().await;
        store
            .insert_target(NewTarget {
                name: "Empty".to_string(),
                url: "https://empty.example.com".to_string(),
                description: None,
            })
            .await
            .unwrap();

        let listings = load_listings(&store).await.unwrap();
        assert_eq!(listings.len(), 2);

        let empty = &listings[0];
        assert_eq!(empty.name, "Empty");
        assert_eq!(empty.avg_rating, 0.0);
        assert_eq!(empty.latest_latency, None);
        assert_eq!(empty.health_percentage, 0.0);

        let weather = &listings[1];
        assert_eq!(weather.id, target.id);
        assert_eq!(weather.avg_rating, 4.0);
        assert_eq!(weather.total_reviews, 3);
        assert_eq!(weather.latest_latency, Some(80));
        assert_eq!(weather.health_percentage, 66.7);
    }

    #[tokio::test]
    async fn test_load_details() {
        let (store, target) = seeded_store().await;

        let details = load_details(&store, &target.id).await.unwrap().unwrap();
        assert_eq!(details.description.as_deref(), Some("天气接口"));
        assert_eq!(details.total_reviews, 3);
        assert_eq!(details.reviews[0].rating, 4);
        let latencies: Vec<_> = details
            .performance_history
            .iter()
            .map(|p| p.latency_ms)
            .collect();
        assert_eq!(latencies, vec![120, 99_999, 80]);

        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["avgRating"], 4.0);
        assert_eq!(value["performanceHistory"][1]["statusCode"], 0);
        assert_eq!(value["reviews"][0]["textContent"], "");

        assert!(load_details(&store, "missing").await.unwrap().is_none());
    }
}
