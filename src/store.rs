use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::info;

use crate::collection::Collection;
use crate::db::{self, Database, crud};
use crate::error::Result;

/// 一张图片的特征向量
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub collection: Collection,
    pub id: String,
    pub vector: Vec<f32>,
    pub extractor_version: u32,
    /// 图片文件的 blake3 哈希，用于增量提取
    pub hash: Vec<u8>,
}

/// 持久化的特征库，每个集合一张表
///
/// 写入为单行 upsert，读取为单条查询，配合 WAL 模式读者总能看到一个一致的快照
#[derive(Debug, Clone)]
pub struct FeatureStore {
    db: Database,
}

impl FeatureStore {
    /// 打开或创建特征库
    ///
    /// # Arguments
    ///
    /// * `filename` - 数据库文件路径
    /// * `wal` - 是否启用 WAL 模式
    pub async fn open(filename: impl AsRef<Path>, wal: bool) -> Result<Self> {
        let db = db::init_db(filename, wal).await?;
        Ok(Self { db })
    }

    /// 写入特征，已存在时覆盖
    pub async fn put(
        &self,
        collection: Collection,
        id: &str,
        vector: &[f32],
        version: u32,
        hash: &[u8],
    ) -> Result<()> {
        let bytes = encode_vector(vector);
        crud::upsert_feature(
            &self.db,
            collection,
            id,
            &bytes,
            vector.len() as i64,
            version as i64,
            hash,
        )
        .await?;
        Ok(())
    }

    /// 读取集合中所有特征的快照
    pub async fn get_all(&self, collection: Collection) -> Result<BTreeMap<String, FeatureVector>> {
        let records = crud::get_features(&self.db, collection).await?;
        let features = records
            .into_iter()
            .map(|record| {
                let vector = decode_vector(&record.vector);
                debug_assert_eq!(vector.len() as i64, record.dim);
                let feature = FeatureVector {
                    collection,
                    id: record.id.clone(),
                    vector,
                    extractor_version: record.extractor_version as u32,
                    hash: record.hash,
                };
                (record.id, feature)
            })
            .collect();
        Ok(features)
    }

    /// 返回 ID 到 (提取器版本, 哈希) 的映射，不读取向量
    pub async fn versions(&self, collection: Collection) -> Result<HashMap<String, (u32, Vec<u8>)>> {
        let records = crud::get_feature_meta(&self.db, collection).await?;
        Ok(records
            .into_iter()
            .map(|r| (r.id, (r.extractor_version as u32, r.hash)))
            .collect())
    }

    pub async fn has(&self, collection: Collection, id: &str) -> Result<bool> {
        Ok(crud::has_feature(&self.db, collection, id).await?)
    }

    /// 删除指定图片的特征
    pub async fn remove(&self, collection: Collection, ids: &[String]) -> Result<u64> {
        Ok(crud::delete_features(&self.db, collection, ids).await?)
    }

    /// 清空集合
    pub async fn clear(&self, collection: Collection) -> Result<()> {
        let n = crud::delete_features_all(&self.db, collection).await?;
        info!("已清空 {} 的 {} 条特征", collection, n);
        Ok(())
    }

    /// 关闭连接池，确保 WAL 写回
    pub async fn close(&self) {
        self.db.close().await;
    }
}

/// 特征按本机字节序直接存为 BLOB
fn encode_vector(vector: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice::<f32, u8>(vector).to_vec()
}

/// BLOB 不保证对齐，所以这里拷贝一份而不是直接 cast
fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytemuck::pod_collect_to_vec::<u8, f32>(bytes)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_vector_codec() {
        let v = vec![0.0, -1.5, f32::MAX, 3.25];
        assert_eq!(decode_vector(&encode_vector(&v)), v);
    }

    #[test]
    fn test_vector_codec_unaligned() {
        let encoded = encode_vector(&[1.0, 2.0]);
        assert_eq!(encoded.len(), 8);
        assert_eq!(&encoded[..4], &1.0f32.to_ne_bytes());

        // 从奇数偏移处读取，模拟未对齐的 BLOB
        let mut buf = vec![0u8];
        buf.extend_from_slice(&encoded);
        assert_eq!(decode_vector(&buf[1..]), vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_put_get_has_clear() {
        let tmp = TempDir::new().unwrap();
        let store = FeatureStore::open(tmp.path().join("test.db"), true).await.unwrap();

        store.put(Collection::Shapes, "a.png", &[1.0, 2.0], 1, b"h1").await.unwrap();
        store.put(Collection::Shapes, "a.png", &[3.0, 4.0], 2, b"h2").await.unwrap();
        store.put(Collection::Textures, "b.png", &[5.0], 1, b"h3").await.unwrap();

        assert!(store.has(Collection::Shapes, "a.png").await.unwrap());
        assert!(!store.has(Collection::Shapes, "b.png").await.unwrap());

        let all = store.get_all(Collection::Shapes).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["a.png"].vector, [3.0, 4.0]);
        assert_eq!(all["a.png"].extractor_version, 2);
        assert_eq!(all["a.png"].hash, b"h2");

        store.clear(Collection::Shapes).await.unwrap();
        assert!(store.get_all(Collection::Shapes).await.unwrap().is_empty());
        assert!(store.has(Collection::Textures, "b.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove() {
        let tmp = TempDir::new().unwrap();
        let store = FeatureStore::open(tmp.path().join("test.db"), false).await.unwrap();
        for id in ["a", "b", "c"] {
            store.put(Collection::Shapes, id, &[0.0], 1, b"").await.unwrap();
        }
        let n = store.remove(Collection::Shapes, &["a".to_owned(), "c".to_owned()]).await.unwrap();
        assert_eq!(n, 2);
        let all = store.get_all(Collection::Shapes).await.unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), ["b"]);
    }
}
