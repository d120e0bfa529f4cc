use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::{Executor, QueryBuilder, Result, Sqlite};

use super::{FeatureMetaRecord, FeatureRecord};
use crate::collection::Collection;

fn now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or_default()
}

/// 写入或覆盖一条特征记录
pub async fn upsert_feature<'c, E>(
    executor: E,
    collection: Collection,
    id: &str,
    vector: &[u8],
    dim: i64,
    version: i64,
    hash: &[u8],
) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!(
        r#"
        INSERT INTO {} (id, vector, dim, extractor_version, hash, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            vector = excluded.vector,
            dim = excluded.dim,
            extractor_version = excluded.extractor_version,
            hash = excluded.hash,
            updated_at = excluded.updated_at
        "#,
        collection.table()
    );
    sqlx::query(&sql)
        .bind(id)
        .bind(vector)
        .bind(dim)
        .bind(version)
        .bind(hash)
        .bind(now())
        .execute(executor)
        .await?;
    Ok(())
}

/// 读取集合中的全部特征，单条语句即一个快照
pub async fn get_features<'c, E>(executor: E, collection: Collection) -> Result<Vec<FeatureRecord>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!(
        "SELECT id, vector, dim, extractor_version, hash FROM {} ORDER BY id",
        collection.table()
    );
    sqlx::query_as::<_, FeatureRecord>(&sql).fetch_all(executor).await
}

/// 读取集合中全部特征的元数据
pub async fn get_feature_meta<'c, E>(
    executor: E,
    collection: Collection,
) -> Result<Vec<FeatureMetaRecord>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("SELECT id, extractor_version, hash FROM {}", collection.table());
    sqlx::query_as::<_, FeatureMetaRecord>(&sql).fetch_all(executor).await
}

/// 检查特征是否存在
pub async fn has_feature<'c, E>(executor: E, collection: Collection, id: &str) -> Result<bool>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?", collection.table());
    let count: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(executor).await?;
    Ok(count > 0)
}

/// 批量删除特征
pub async fn delete_features<'c, E>(executor: E, collection: Collection, ids: &[String]) -> Result<u64>
where
    E: Executor<'c, Database = Sqlite>,
{
    if ids.is_empty() {
        return Ok(0);
    }
    let mut query = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {} WHERE id IN (", collection.table()));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");
    let result = query.build().execute(executor).await?;
    Ok(result.rows_affected())
}

/// 清空集合的所有特征
pub async fn delete_features_all<'c, E>(executor: E, collection: Collection) -> Result<u64>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("DELETE FROM {}", collection.table());
    let result = sqlx::query(&sql).execute(executor).await?;
    Ok(result.rows_affected())
}
