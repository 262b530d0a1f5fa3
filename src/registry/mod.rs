//! 目标登记与评价提交
//!
//! 先校验再写入存储

pub mod validation;

pub use validation::{validate_rating, validate_url, ReviewSubmission, TargetSubmission};

use crate::error::Result;
use crate::store::{RegistryStore, Review, Target};
use tracing::info;

/// 登记新目标
pub async fn submit_target(store: &dyn RegistryStore, submission: TargetSubmission) -> Result<Target> {
    let new_target = submission.validate()?;
    let target = store.insert_target(new_target).await?;
    info!("登记新目标: {} ({})", target.name, target.url);
    Ok(target)
}

/// 提交评价
pub async fn submit_review(store: &dyn RegistryStore, submission: ReviewSubmission) -> Result<Review> {
    let new_review = submission.validate()?;
    let review = store.insert_review(new_review).await?;
    info!("新增评价: 目标 {} 评分 {}", review.target_id, review.rating);
    Ok(review)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiVitalsError, StoreError, ValidationError};
    use crate::store::SqliteStore;

    #[tokio::test]
    async fn test_invalid_url_never_reaches_store() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let err = submit_target(
            &store,
            TargetSubmission {
                name: Some("broken".to_string()),
                url: Some("not-a-url".to_string()),
                description: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ApiVitalsError::Validation(ValidationError::InvalidUrl(_))
        ));
        assert!(store.list_targets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_and_unknown_target() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let submission = TargetSubmission {
            name: Some("dup".to_string()),
            url: Some("https://dup.example.com".to_string()),
            description: None,
        };
        submit_target(&store, submission.clone()).await.unwrap();

        let err = submit_target(&store, submission).await.unwrap_err();
        assert!(matches!(err, ApiVitalsError::Store(StoreError::DuplicateUrl(_))));

        let err = submit_review(
            &store,
            ReviewSubmission {
                api_id: Some("missing".to_string()),
                rating: Some(serde_json::json!(4)),
                text_content: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiVitalsError::Store(StoreError::UnknownTarget(_))));
    }
}
