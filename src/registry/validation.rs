//! 提交内容校验
//!
//! 校验在写入存储之前完成，失败的提交不会触达存储

use crate::error::ValidationError;
use crate::store::{NewReview, NewTarget};
use reqwest::Url;
use serde::Deserialize;

/// 最低评分
pub const MIN_RATING: u8 = 1;
/// 最高评分
pub const MAX_RATING: u8 = 5;

/// 目标登记请求
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSubmission {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
}

/// 评价提交请求
///
/// `rating` 以原始 JSON 值接收，以便区分缺失、类型错误和越界
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub api_id: Option<String>,
    pub rating: Option<serde_json::Value>,
    pub text_content: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

/// 只接受 http/https 的绝对地址
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    let parsed = Url::parse(url).map_err(|_| ValidationError::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(()),
        _ => Err(ValidationError::InvalidUrl(url.to_string())),
    }
}

/// 校验评分并向下取整
pub fn validate_rating(rating: &serde_json::Value) -> Result<u8, ValidationError> {
    let value = rating.as_f64().ok_or(ValidationError::InvalidRating)?;

    if !(f64::from(MIN_RATING)..=f64::from(MAX_RATING)).contains(&value) {
        return Err(ValidationError::RatingOutOfRange);
    }

    Ok(value.floor() as u8)
}

impl TargetSubmission {
    /// 校验并转换为待写入的目标
    pub fn validate(self) -> Result<NewTarget, ValidationError> {
        let name = required(self.name, "name")?;
        let url = required(self.url, "url")?;
        validate_url(&url)?;

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(NewTarget {
            name,
            url,
            description,
        })
    }
}

impl ReviewSubmission {
    /// 校验并转换为待写入的评价，缺省的内容记为空字符串
    pub fn validate(self) -> Result<NewReview, ValidationError> {
        let target_id = required(self.api_id, "apiId")?;
        let rating = match &self.rating {
            None | Some(serde_json::Value::Null) => {
                return Err(ValidationError::MissingField("rating"))
            }
            Some(value) => validate_rating(value)?,
        };

        Ok(NewReview {
            target_id,
            rating,
            text_content: self.text_content.unwrap_or_default(),
        })
    }
}
