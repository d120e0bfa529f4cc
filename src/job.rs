use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use indicatif::ProgressBar;
use log::{info, warn};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;
use tokio::time::timeout;

use crate::collection::Collection;
use crate::config::ExtractOptions;
use crate::descriptor::{Descriptor, Extractor};
use crate::error::{Error, Result};
use crate::metrics;
use crate::registry::{ImageRecord, Registry};
use crate::store::FeatureStore;

/// 一次提取任务的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    /// 尝试处理的图片数量
    pub attempted: usize,
    /// 成功的图片数量，包含未变化而复用的
    pub succeeded: usize,
    /// 提取失败的图片
    pub failed: Vec<String>,
    /// 哈希与版本均未变化、直接复用旧特征的图片数量
    pub reused: usize,
    /// 图片已不存在而被删除的特征数量
    pub removed: u64,
    /// 任务是否被中途取消
    pub cancelled: bool,
}

/// 取消标记，任务在两张图片之间检查
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum Outcome {
    Extracted { id: String, vector: Vec<f32>, hash: Vec<u8> },
    Reused,
    Failed(Error),
    Cancelled,
}

/// 特征提取任务，同一集合的任务互斥，不同集合可以并行
#[derive(Debug, Clone)]
pub struct JobRunner {
    registry: Registry,
    store: FeatureStore,
    opts: ExtractOptions,
    locks: Arc<[Mutex<()>; 2]>,
    cancel: CancelFlag,
    pb: ProgressBar,
}

impl JobRunner {
    pub fn new(registry: Registry, store: FeatureStore, opts: ExtractOptions) -> Self {
        Self {
            registry,
            store,
            opts,
            locks: Arc::new([Mutex::new(()), Mutex::new(())]),
            cancel: CancelFlag::default(),
            pb: ProgressBar::hidden(),
        }
    }

    /// 使用指定的进度条显示提取进度
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn extractor(&self, collection: Collection) -> Extractor {
        Extractor::for_collection(collection, &self.opts)
    }

    /// 提取集合中所有图片的特征
    ///
    /// # Arguments
    ///
    /// * `collection` - 图片集合
    /// * `force` - 是否先清空集合的特征再全部重新提取
    pub async fn run(&self, collection: Collection, force: bool) -> Result<JobSummary> {
        let _guard = self.locks[collection.index()].lock().await;

        let images = self.registry.list(collection)?;
        if images.is_empty() {
            return Err(Error::EmptyCollection(collection));
        }
        info!("开始提取 {} 的特征，共 {} 张图片", collection, images.len());

        if force {
            self.store.clear(collection).await?;
        }

        let mut summary = JobSummary::default();
        let known = self.store.versions(collection).await?;

        let listed = images.iter().map(|r| r.id.as_str()).collect::<HashSet<_>>();
        let stale = known.keys().filter(|id| !listed.contains(id.as_str())).cloned().collect::<Vec<_>>();
        if !stale.is_empty() {
            summary.removed = self.store.remove(collection, &stale).await?;
            info!("删除 {} 条已不存在图片的特征", summary.removed);
        }

        let extractor = Arc::new(self.extractor(collection));
        let version = extractor.version();
        let limit = self.opts.timeout;

        self.pb.set_length(images.len() as u64);

        let mut outcomes = futures::stream::iter(images)
            .map(|record| {
                let previous = known.get(&record.id).cloned();
                let extractor = extractor.clone();
                let cancel = self.cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return Outcome::Cancelled;
                    }
                    process(record, extractor, previous, version, limit).await
                }
            })
            .buffered(self.opts.jobs.max(1));

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Outcome::Extracted { id, vector, hash } => {
                    self.store.put(collection, &id, &vector, version, &hash).await?;
                    metrics::inc_extract_count(collection.name(), "extracted");
                    self.pb.set_message(id);
                    summary.succeeded += 1;
                }
                Outcome::Reused => {
                    metrics::inc_extract_count(collection.name(), "reused");
                    summary.succeeded += 1;
                    summary.reused += 1;
                }
                Outcome::Failed(err) => {
                    warn!("{err}");
                    metrics::inc_extract_count(collection.name(), "failed");
                    self.pb.println(err.to_string());
                    if let Error::ExtractionFailed { id, .. } = err {
                        summary.failed.push(id);
                    }
                }
                Outcome::Cancelled => {
                    summary.cancelled = true;
                    continue;
                }
            }
            summary.attempted += 1;
            self.pb.inc(1);
        }

        info!(
            "{} 提取完成：尝试 {}，成功 {}（复用 {}），失败 {}{}",
            collection,
            summary.attempted,
            summary.succeeded,
            summary.reused,
            summary.failed.len(),
            if summary.cancelled { "，任务已取消" } else { "" }
        );
        Ok(summary)
    }

    /// 添加单张图片：先在阻塞线程池中提取特征，成功后才写入集合目录并保存特征
    ///
    /// 与提取任务共用集合锁，不会和同一集合的任务交错写入
    pub async fn add(&self, collection: Collection, id: &str, bytes: Vec<u8>) -> Result<()> {
        let extractor = self.extractor(collection);
        let version = extractor.version();
        let failed = |reason: String| Error::ExtractionFailed { id: id.to_owned(), reason };

        let task = spawn_blocking(move || {
            let hash = blake3::hash(&bytes).as_bytes().to_vec();
            let vector = extractor.extract_bytes(&bytes).map_err(|e| e.to_string())?;
            Ok::<_, String>((bytes, hash, vector))
        });
        let (bytes, hash, vector) = match timeout(self.opts.timeout, task).await {
            Ok(Ok(Ok(extracted))) => extracted,
            Ok(Ok(Err(reason))) => return Err(failed(reason)),
            Ok(Err(e)) => return Err(failed(format!("提取线程异常: {e}"))),
            Err(_) => return Err(failed(format!("超过 {:?} 未完成", self.opts.timeout))),
        };

        let _guard = self.locks[collection.index()].lock().await;
        let path = self.registry.dir(collection).join(id);
        if let Err(source) = tokio::fs::write(&path, &bytes).await {
            return Err(Error::Registry { path, source });
        }
        self.store.put(collection, id, &vector, version, &hash).await?;
        metrics::inc_extract_count(collection.name(), "extracted");
        info!("已添加图片 {} 到 {}", id, collection);
        Ok(())
    }
}

/// 处理单张图片：哈希未变化则复用，否则在阻塞线程池中解码并提取
async fn process(
    record: ImageRecord,
    extractor: Arc<Extractor>,
    previous: Option<(u32, Vec<u8>)>,
    version: u32,
    limit: Duration,
) -> Outcome {
    let id = record.id.clone();
    let failed = |reason: String| Outcome::Failed(Error::ExtractionFailed { id: id.clone(), reason });

    let task = spawn_blocking(move || -> std::result::Result<Outcome, String> {
        let bytes = std::fs::read(&record.path).map_err(|e| e.to_string())?;
        let hash = blake3::hash(&bytes).as_bytes().to_vec();
        if previous.is_some_and(|(v, h)| v == version && h == hash) {
            return Ok(Outcome::Reused);
        }
        let vector = extractor.extract_bytes(&bytes).map_err(|e| e.to_string())?;
        Ok(Outcome::Extracted { id: record.id, vector, hash })
    });

    match timeout(limit, task).await {
        Ok(Ok(Ok(outcome))) => outcome,
        Ok(Ok(Err(reason))) => failed(reason),
        Ok(Err(e)) => failed(format!("提取线程异常: {e}")),
        // 超时的线程仍会在后台跑完，但结果会被丢弃
        Err(_) => failed(format!("超过 {:?} 未完成", limit)),
    }
}
