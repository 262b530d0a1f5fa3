//! 扇出调度器
//!
//! 每个目标一个任务并发探测，结果到达即写入，周期结束时汇总。
//! 调度器本身不持有定时器，只负责"立即执行一个周期"

use super::executor::ProbeExecutor;
use super::outcome::ProbeOutcome;
use super::recorder::ResultRecorder;
use crate::logging::{cycle_log, probe_log};
use crate::store::{RegistryStore, Target};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// 一个探测周期的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// 本周期的目标数量
    pub targets: usize,
    /// 成功写入的样本数量
    pub recorded: usize,
    /// 传输层失败（哨兵结果）的数量
    pub transport_failures: usize,
    /// 写入失败或任务异常的数量
    pub persist_failures: usize,
    /// 周期耗时
    pub elapsed: Duration,
}

/// 单个探测任务的结果
#[derive(Debug, Clone, Copy)]
struct ProbeReport {
    outcome: ProbeOutcome,
    recorded: bool,
}

/// 扇出调度器
#[derive(Clone)]
pub struct FanOutScheduler {
    executor: Arc<dyn ProbeExecutor>,
    recorder: Arc<dyn ResultRecorder>,
    /// 并发上限，不设置则不限制
    semaphore: Option<Arc<Semaphore>>,
    /// 探测日志是否输出为 JSON
    json_logs: bool,
}

impl FanOutScheduler {
    /// 创建新的调度器
    ///
    /// # 参数
    /// * `executor` - 探测执行器
    /// * `recorder` - 结果记录器
    pub fn new(executor: Arc<dyn ProbeExecutor>, recorder: Arc<dyn ResultRecorder>) -> Self {
        Self {
            executor,
            recorder,
            semaphore: None,
            json_logs: false,
        }
    }

    /// 限制同时进行中的探测数量，`None` 表示不限制
    pub fn with_concurrency_limit(mut self, limit: Option<usize>) -> Self {
        self.semaphore = limit.filter(|n| *n > 0).map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    /// 探测日志使用 JSON 格式
    pub fn with_json_logs(mut self, json_logs: bool) -> Self {
        self.json_logs = json_logs;
        self
    }

    /// 对给定目标执行一个探测周期
    ///
    /// 所有探测同时开始，互不等待；全部完成后返回汇总
    pub async fn run_cycle(&self, targets: &[Target]) -> CycleSummary {
        if targets.is_empty() {
            debug!("没有已登记的目标，跳过本次探测");
            return CycleSummary::default();
        }

        let started = Instant::now();
        info!("开始探测周期，目标数量: {}", targets.len());

        let handles: Vec<_> = targets
            .iter()
            .map(|target| self.spawn_probe(target))
            .collect();

        let results = join_all(handles).await;

        let mut summary = CycleSummary {
            targets: targets.len(),
            ..Default::default()
        };

        for (target, result) in targets.iter().zip(results) {
            match result {
                Ok(report) => {
                    if report.outcome.is_transport_failure() {
                        summary.transport_failures += 1;
                    }
                    if report.recorded {
                        summary.recorded += 1;
                    } else {
                        summary.persist_failures += 1;
                    }
                }
                Err(e) => {
                    error!("探测任务异常退出: {} - {}", target.name, e);
                    summary.persist_failures += 1;
                }
            }
        }

        summary.elapsed = started.elapsed();
        cycle_log(self.json_logs, &summary);
        summary
    }

    /// 从存储读取当前目标并执行一个周期
    ///
    /// 读取失败时记录日志并返回空汇总，不发起任何探测
    pub async fn run_from_store(&self, store: &dyn RegistryStore) -> CycleSummary {
        match store.list_targets().await {
            Ok(targets) => self.run_cycle(&targets).await,
            Err(e) => {
                error!("读取目标列表失败，本次探测周期结束: {}", e);
                CycleSummary::default()
            }
        }
    }

    fn spawn_probe(&self, target: &Target) -> tokio::task::JoinHandle<ProbeReport> {
        let executor = Arc::clone(&self.executor);
        let recorder = Arc::clone(&self.recorder);
        let semaphore = self.semaphore.clone();
        let json_logs = self.json_logs;
        let target_id = target.id.clone();
        let target_name = target.name.clone();
        let url = target.url.clone();

        tokio::spawn(async move {
            let permit = match semaphore {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(e) => {
                        warn!("获取并发许可失败，直接探测: {} - {}", target_name, e);
                        None
                    }
                },
                None => None,
            };

            let outcome = executor.probe(&url).await;
            drop(permit);

            probe_log(json_logs, &target_name, &outcome);

            let recorded = recorder.record(&target_id, outcome).await;
            ProbeReport { outcome, recorded }
        })
    }
}
