use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};
use ndarray::Array2;

use crate::collection::Collection;
use crate::config::{ConfDir, ExtractOptions};
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::job::{CancelFlag, JobRunner, JobSummary};
use crate::metrics;
use crate::registry::{ImageRecord, Registry};
use crate::search::{SearchQuery, SearchResult, rank, similarity};
use crate::store::{FeatureStore, FeatureVector};

pub struct EngineBuilder {
    conf_dir: ConfDir,
    registry: Registry,
    extract: ExtractOptions,
    wal: bool,
    auto_reindex: bool,
}

impl EngineBuilder {
    pub fn new(conf_dir: ConfDir, registry: Registry) -> Self {
        Self { conf_dir, registry, extract: ExtractOptions::default(), wal: true, auto_reindex: true }
    }

    /// 特征提取参数
    pub fn extract_options(mut self, extract: ExtractOptions) -> Self {
        self.extract = extract;
        self
    }

    /// 是否启用 WAL 模式，启用后搜索不会被提取任务阻塞
    pub fn wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    /// 搜索时发现特征版本过期，是否自动重新提取
    pub fn auto_reindex(mut self, auto_reindex: bool) -> Self {
        self.auto_reindex = auto_reindex;
        self
    }

    pub async fn open(self) -> Result<Engine> {
        std::fs::create_dir_all(self.conf_dir.path())
            .map_err(|e| Error::StoreIo(sqlx::Error::Io(e)))?;
        let store = FeatureStore::open(self.conf_dir.database(), self.wal).await?;
        let jobs = JobRunner::new(self.registry.clone(), store.clone(), self.extract);
        Ok(Engine { registry: self.registry, store, jobs, auto_reindex: self.auto_reindex })
    }
}

/// 检索引擎：图片目录 + 特征库 + 提取任务 + 搜索
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Registry,
    store: FeatureStore,
    jobs: JobRunner,
    auto_reindex: bool,
}

impl Engine {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.jobs.cancel_flag()
    }

    /// 替换提取任务的进度条
    pub fn set_progress(&mut self, pb: indicatif::ProgressBar) {
        self.jobs = self.jobs.clone().with_progress(pb);
    }

    /// 列出集合中的图片
    pub fn list(&self, collection: Collection) -> Result<Vec<ImageRecord>> {
        self.registry.list(collection)
    }

    /// 提取集合中所有图片的特征
    pub async fn extract(&self, collection: Collection, force: bool) -> Result<JobSummary> {
        self.jobs.run(collection, force).await
    }

    /// 保存上传的图片并提取特征，返回图片 ID
    ///
    /// 只保留文件名部分，同名图片会被覆盖
    pub async fn upload(&self, collection: Collection, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let id = Path::new(file_name)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .filter(|name| self.registry.accepts(collection, name))
            .ok_or_else(|| Error::UnsupportedFormat(file_name.to_owned()))?;
        self.jobs.add(collection, &id, bytes).await?;
        Ok(id)
    }

    /// 清空集合的特征
    pub async fn clear(&self, collection: Collection) -> Result<()> {
        self.store.clear(collection).await
    }

    /// 在集合中搜索与查询图片最相似的图片
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let result = self.search_inner(query).await;
        metrics::inc_search_count(query.collection.name(), result.is_ok());
        metrics::inc_search_duration(query.collection.name(), start.elapsed().as_secs_f32());
        debug!("搜索耗时: {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);
        result
    }

    async fn search_inner(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let top_k = query.top_k()?;
        let collection = query.collection;
        let extractor = self.jobs.extractor(collection);
        let (version, dim) = (extractor.version(), extractor.dim());

        let records = self
            .registry
            .list(collection)?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect::<HashMap<_, _>>();

        let is_current = |f: &FeatureVector| f.extractor_version == version && f.vector.len() == dim;

        let mut features = self.store.get_all(collection).await?;
        let stale = features
            .values()
            .any(|f| records.contains_key(&f.id) && !is_current(f));
        if stale && self.auto_reindex {
            info!("{} 中存在过期的特征，重新提取", collection);
            self.jobs.run(collection, false).await?;
            features = self.store.get_all(collection).await?;
        }

        // 图片已删除或版本仍不一致的特征不参与搜索
        features.retain(|id, f| records.contains_key(id) && is_current(f));

        let Some(query_vector) = features.get(&query.query_id) else {
            return Err(Error::QueryNotIndexed(query.query_id.clone()));
        };
        if features.len() != records.len() {
            warn!("{} 中有 {} 张图片尚未提取特征", collection, records.len().saturating_sub(features.len()));
        }

        let candidates = features.iter().map(|(id, f)| (id.as_str(), f.vector.as_slice()));
        let ranked = rank(&extractor, &query.query_id, &query_vector.vector, candidates, top_k);

        let scale = extractor.similarity_scale();
        let results = ranked
            .into_iter()
            .filter_map(|(id, distance)| {
                let record = records.get(id)?;
                Some(SearchResult {
                    id: id.to_owned(),
                    path: record.path.clone(),
                    distance,
                    similarity: similarity(distance, scale),
                })
            })
            .collect();
        Ok(results)
    }

    /// 导出集合中当前版本的所有特征，返回 ID 列表和按行排列的特征矩阵
    pub async fn export(&self, collection: Collection) -> Result<(Vec<String>, Array2<f32>)> {
        let extractor = self.jobs.extractor(collection);
        let (version, dim) = (extractor.version(), extractor.dim());

        let features = self.store.get_all(collection).await?;
        let mut ids = vec![];
        let mut data = Vec::with_capacity(features.len() * dim);
        for (id, f) in features {
            if f.extractor_version != version || f.vector.len() != dim {
                continue;
            }
            ids.push(id);
            data.extend(f.vector);
        }
        let matrix = Array2::from_shape_vec((ids.len(), dim), data)?;
        Ok((ids, matrix))
    }

    /// 关闭特征库
    pub async fn close(&self) {
        self.store.close().await;
    }
}
