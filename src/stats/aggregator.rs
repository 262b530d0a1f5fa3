//! 读取时聚合计算
//!
//! 所有函数都是纯函数，不缓存任何状态

use crate::store::{PerformanceSample, Review};

/// 评价的平均分，没有评价时为 0
pub fn average_rating(reviews: &[Review]) -> f64 {
    mean_rating(reviews.iter().map(|r| r.rating))
}

/// 对评分序列求平均，没有评分时为 0
pub fn mean_rating<I>(ratings: I) -> f64
where
    I: IntoIterator<Item = u8>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r), count + 1));

    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// 状态码落在 [200, 400) 的样本占比（百分比），没有样本时为 0
pub fn health_percentage(samples: &[PerformanceSample]) -> f64 {
    healthy_ratio(samples.iter().map(|s| s.status_code))
}

/// 对状态码序列计算健康占比（百分比）
pub fn healthy_ratio<I>(status_codes: I) -> f64
where
    I: IntoIterator<Item = u16>,
{
    let (healthy, total) = status_codes
        .into_iter()
        .fold((0u64, 0u64), |(healthy, total), code| {
            let ok = (200..400).contains(&code);
            (healthy + u64::from(ok), total + 1)
        });

    if total == 0 {
        0.0
    } else {
        healthy as f64 / total as f64 * 100.0
    }
}

/// 最近一次样本的延迟，没有样本时为 `None`
///
/// 样本可以是任意顺序，按时间戳取最新一条；时间相同时取靠后的一条
pub fn latest_latency(samples: &[PerformanceSample]) -> Option<u64> {
    samples
        .iter()
        .enumerate()
        .max_by_key(|(index, s)| (s.timestamp, *index))
        .map(|(_, s)| s.latency_ms)
}

/// 保留一位小数，仅用于展示
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
