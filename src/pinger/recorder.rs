//! 探测结果记录器

use super::outcome::ProbeOutcome;
use crate::store::{NewSample, RegistryStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

/// 结果记录器trait
#[async_trait]
pub trait ResultRecorder: Send + Sync {
    /// 追加一条探测样本，返回是否写入成功
    ///
    /// 写入失败只记录日志，不向外返回错误
    async fn record(&self, target_id: &str, outcome: ProbeOutcome) -> bool;
}

/// 写入存储的记录器
#[derive(Clone)]
pub struct StoreRecorder {
    store: Arc<dyn RegistryStore>,
}

impl StoreRecorder {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResultRecorder for StoreRecorder {
    async fn record(&self, target_id: &str, outcome: ProbeOutcome) -> bool {
        let sample = NewSample {
            target_id: target_id.to_string(),
            latency_ms: outcome.latency_ms,
            status_code: outcome.status_code,
        };

        match self.store.insert_sample(sample).await {
            Ok(_) => true,
            Err(e) => {
                error!("保存探测样本失败: 目标 {} - {}", target_id, e);
                false
            }
        }
    }
}
