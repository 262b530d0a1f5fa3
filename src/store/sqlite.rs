//! 基于 SQLite 的存储实现
//!
//! 使用 sqlx 连接池，启动时执行 `migrations/` 下的迁移脚本

use super::models::format_timestamp;
use super::{
    NewReview, NewSample, NewTarget, PerformanceSample, RegistryStore, Review, SortOrder,
    StoreResult, Target,
};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// 文件数据库的最大连接数
const FILE_POOL_MAX_CONNECTIONS: u32 = 8;

/// 写锁等待时间
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite 存储
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// 连接数据库并执行迁移
    ///
    /// # 参数
    /// * `database_url` - 形如 `sqlite://api-vitals.db` 或 `sqlite::memory:` 的地址
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::Database(format!("无效的数据库地址 {}: {}", database_url, e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if is_in_memory(database_url) {
            // 内存库只存在于单个连接中，所有写入必须共用同一个连接
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(FILE_POOL_MAX_CONNECTIONS)
                .connect_with(
                    options
                        .journal_mode(SqliteJournalMode::Wal)
                        .busy_timeout(BUSY_TIMEOUT),
                )
                .await
        }
        .map_err(|e| StoreError::Database(format!("连接数据库失败: {}", e)))?;

        tracing::info!("已连接数据库: {}", database_url);

        let store = Self::from_pool(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    /// 使用已有连接池创建存储（不执行迁移）
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 执行数据库迁移
    pub async fn run_migrations(&self) -> StoreResult<()> {
        tracing::debug!("执行数据库迁移");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("数据库迁移失败: {}", e)))?;

        Ok(())
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// 约束冲突类型
#[derive(Debug, PartialEq, Eq)]
enum Violation {
    ForeignKey,
    Unique,
}

fn constraint_violation(err: &sqlx::Error) -> Option<Violation> {
    let db_err = err.as_database_error()?;
    if db_err.is_foreign_key_violation() {
        return Some(Violation::ForeignKey);
    }
    if db_err.is_unique_violation() {
        return Some(Violation::Unique);
    }

    // 部分构建下只返回主错误码，此时退回到错误信息匹配
    let message = db_err.message();
    if message.contains("FOREIGN KEY constraint failed") {
        Some(Violation::ForeignKey)
    } else if message.contains("UNIQUE constraint failed") {
        Some(Violation::Unique)
    } else {
        None
    }
}

fn database_error(action: &str, err: sqlx::Error) -> StoreError {
    StoreError::Database(format!("{}: {}", action, err))
}

fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(format!("无效的时间戳 {}: {}", value, e)))
}

#[derive(sqlx::FromRow)]
struct TargetRow {
    id: String,
    name: String,
    url: String,
    description: Option<String>,
    date_submitted: String,
}

impl TryFrom<TargetRow> for Target {
    type Error = StoreError;

    fn try_from(row: TargetRow) -> Result<Self, Self::Error> {
        Ok(Target {
            id: row.id,
            name: row.name,
            url: row.url,
            description: row.description,
            created_at: parse_timestamp(&row.date_submitted)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SampleRow {
    id: String,
    api_id: String,
    timestamp: String,
    latency_ms: i64,
    status_code: i64,
}

impl TryFrom<SampleRow> for PerformanceSample {
    type Error = StoreError;

    fn try_from(row: SampleRow) -> Result<Self, Self::Error> {
        Ok(PerformanceSample {
            latency_ms: u64::try_from(row.latency_ms)
                .map_err(|_| StoreError::Database(format!("无效的延迟值: {}", row.latency_ms)))?,
            status_code: u16::try_from(row.status_code)
                .map_err(|_| StoreError::Database(format!("无效的状态码: {}", row.status_code)))?,
            timestamp: parse_timestamp(&row.timestamp)?,
            id: row.id,
            target_id: row.api_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: String,
    api_id: String,
    rating: i64,
    text_content: String,
    date_created: String,
}

impl TryFrom<ReviewRow> for Review {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review {
            rating: u8::try_from(row.rating)
                .map_err(|_| StoreError::Database(format!("无效的评分: {}", row.rating)))?,
            created_at: parse_timestamp(&row.date_created)?,
            id: row.id,
            target_id: row.api_id,
            text_content: row.text_content,
        })
    }
}

#[async_trait]
impl RegistryStore for SqliteStore {
    async fn list_targets(&self) -> StoreResult<Vec<Target>> {
        let rows = sqlx::query_as::<_, TargetRow>(
            "SELECT id, name, url, description, date_submitted FROM apis \
             ORDER BY date_submitted DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("查询目标列表失败", e))?;

        rows.into_iter().map(Target::try_from).collect()
    }

    async fn get_target(&self, id: &str) -> StoreResult<Option<Target>> {
        let row = sqlx::query_as::<_, TargetRow>(
            "SELECT id, name, url, description, date_submitted FROM apis WHERE id = ? LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("查询目标失败", e))?;

        row.map(Target::try_from).transpose()
    }

    async fn insert_target(&self, target: NewTarget) -> StoreResult<Target> {
        let created = Target {
            id: Uuid::new_v4().to_string(),
            name: target.name,
            url: target.url,
            description: target.description,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO apis (id, name, url, description, date_submitted) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&created.id)
        .bind(&created.name)
        .bind(&created.url)
        .bind(&created.description)
        .bind(format_timestamp(&created.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match constraint_violation(&e) {
            Some(Violation::Unique) => StoreError::DuplicateUrl(created.url.clone()),
            _ => database_error("登记目标失败", e),
        })?;

        Ok(created)
    }

    async fn insert_sample(&self, sample: NewSample) -> StoreResult<PerformanceSample> {
        let created = PerformanceSample {
            id: Uuid::new_v4().to_string(),
            target_id: sample.target_id,
            timestamp: Utc::now(),
            latency_ms: sample.latency_ms,
            status_code: sample.status_code,
        };

        let latency_ms = i64::try_from(created.latency_ms)
            .map_err(|_| StoreError::Database(format!("延迟值超出范围: {}", created.latency_ms)))?;

        sqlx::query(
            "INSERT INTO performance_tests (id, api_id, timestamp, latency_ms, status_code) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&created.id)
        .bind(&created.target_id)
        .bind(format_timestamp(&created.timestamp))
        .bind(latency_ms)
        .bind(i64::from(created.status_code))
        .execute(&self.pool)
        .await
        .map_err(|e| match constraint_violation(&e) {
            Some(Violation::ForeignKey) => StoreError::UnknownTarget(created.target_id.clone()),
            _ => database_error("写入探测样本失败", e),
        })?;

        Ok(created)
    }

    async fn list_samples(
        &self,
        target_id: &str,
        order: SortOrder,
    ) -> StoreResult<Vec<PerformanceSample>> {
        let sql = format!(
            "SELECT id, api_id, timestamp, latency_ms, status_code FROM performance_tests \
             WHERE api_id = ? ORDER BY timestamp {dir}, rowid {dir}",
            dir = order.as_sql()
        );

        let rows = sqlx::query_as::<_, SampleRow>(&sql)
            .bind(target_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error("查询探测样本失败", e))?;

        rows.into_iter().map(PerformanceSample::try_from).collect()
    }

    async fn list_reviews(&self, target_id: &str, order: SortOrder) -> StoreResult<Vec<Review>> {
        let sql = format!(
            "SELECT id, api_id, rating, text_content, date_created FROM reviews \
             WHERE api_id = ? ORDER BY date_created {dir}, rowid {dir}",
            dir = order.as_sql()
        );

        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(target_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error("查询评价失败", e))?;

        rows.into_iter().map(Review::try_from).collect()
    }

    async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
        let created = Review {
            id: Uuid::new_v4().to_string(),
            target_id: review.target_id,
            rating: review.rating,
            text_content: review.text_content,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO reviews (id, api_id, rating, text_content, date_created) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&created.id)
        .bind(&created.target_id)
        .bind(i64::from(created.rating))
        .bind(&created.text_content)
        .bind(format_timestamp(&created.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match constraint_violation(&e) {
            Some(Violation::ForeignKey) => StoreError::UnknownTarget(created.target_id.clone()),
            _ => database_error("写入评价失败", e),
        })?;

        Ok(created)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("数据库连通性检查失败", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    fn new_target(name: &str, url: &str) -> NewTarget {
        NewTarget {
            name: name.to_string(),
            url: url.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_target() {
        let store = memory_store().await;
        let created = store
            .insert_target(NewTarget {
                name: "Cat Facts".to_string(),
                url: "https://catfact.ninja/fact".to_string(),
                description: Some("随机猫咪冷知识".to_string()),
            })
            .await
            .unwrap();

        let fetched = store.get_target(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Cat Facts");
        assert_eq!(fetched.description.as_deref(), Some("随机猫咪冷知识"));
        assert_eq!(
            format_timestamp(&fetched.created_at),
            format_timestamp(&created.created_at)
        );

        assert!(store.get_target("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_url_is_rejected() {
        let store = memory_store().await;
        store
            .insert_target(new_target("A", "https://example.com/a"))
            .await
            .unwrap();

        let err = store
            .insert_target(new_target("B", "https://example.com/a"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUrl(url) if url == "https://example.com/a"));
        assert_eq!(store.list_targets().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_targets_newest_first() {
        let store = memory_store().await;
        let first = store
            .insert_target(new_target("first", "https://example.com/1"))
            .await
            .unwrap();
        let second = store
            .insert_target(new_target("second", "https://example.com/2"))
            .await
            .unwrap();

        let targets = store.list_targets().await.unwrap();
        let ids: Vec<_> = targets.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_orphan_sample_is_rejected() {
        let store = memory_store().await;
        let err = store
            .insert_sample(NewSample {
                target_id: "no-such-target".to_string(),
                latency_ms: 10,
                status_code: 200,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::UnknownTarget(id) if id == "no-such-target"));
    }

    #[tokio::test]
    async fn test_orphan_review_is_rejected() {
        let store = memory_store().await;
        let err = store
            .insert_review(NewReview {
                target_id: "no-such-target".to_string(),
                rating: 4,
                text_content: String::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::UnknownTarget(_)));
    }

    #[tokio::test]
    async fn test_samples_ordering() {
        let store = memory_store().await;
        let target = store
            .insert_target(new_target("t", "https://example.com/t"))
            .await
            .unwrap();

        for (latency, status) in [(10, 200), (20, 500), (99_999, 0)] {
            store
                .insert_sample(NewSample {
                    target_id: target.id.clone(),
                    latency_ms: latency,
                    status_code: status,
                })
                .await
                .unwrap();
        }

        let ascending = store
            .list_samples(&target.id, SortOrder::Ascending)
            .await
            .unwrap();
        let latencies: Vec<_> = ascending.iter().map(|s| s.latency_ms).collect();
        assert_eq!(latencies, vec![10, 20, 99_999]);

        let descending = store
            .list_samples(&target.id, SortOrder::Descending)
            .await
            .unwrap();
        assert_eq!(descending[0].status_code, 0);
        assert_eq!(descending[0].latency_ms, 99_999);
    }

    #[tokio::test]
    async fn test_reviews_roundtrip() {
        let store = memory_store().await;
        let target = store
            .insert_target(new_target("t", "https://example.com/t"))
            .await
            .unwrap();

        store
            .insert_review(NewReview {
                target_id: target.id.clone(),
                rating: 5,
                text_content: "很稳定".to_string(),
            })
            .await
            .unwrap();
        store
            .insert_review(NewReview {
                target_id: target.id.clone(),
                rating: 3,
                text_content: String::new(),
            })
            .await
            .unwrap();

        let reviews = store
            .list_reviews(&target.id, SortOrder::Descending)
            .await
            .unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].rating, 3);
        assert_eq!(reviews[0].text_content, "");
        assert_eq!(reviews[1].text_content, "很稳定");
    }

    #[tokio::test]
    async fn test_ping_and_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("vitals.db").display());

        let store = SqliteStore::connect(&url).await.unwrap();
        store.ping().await.unwrap();
        store
            .insert_target(new_target("t", "https://example.com/t"))
            .await
            .unwrap();
        store.close().await;

        // 重新打开后迁移可重复执行，数据仍在
        let reopened = SqliteStore::connect(&url).await.unwrap();
        assert_eq!(reopened.list_targets().await.unwrap().len(), 1);
    }

    #[test]
    fn test_is_in_memory() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:vitals?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://api-vitals.db"));
    }
}
