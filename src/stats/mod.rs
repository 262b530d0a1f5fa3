//! 聚合统计模块
//!
//! 读取时计算平均评分、健康占比和最新延迟，并组装列表与详情视图

pub mod aggregator;
pub mod report;

pub use aggregator::{average_rating, health_percentage, latest_latency, round_one_decimal};
pub use report::{load_details, load_listings, ApiDetails, ApiListing, HistoryPoint, ReviewEntry};
