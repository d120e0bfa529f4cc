use sqlx::FromRow;

/// 特征表中的一行
#[derive(Debug, FromRow)]
pub struct FeatureRecord {
    /// 图片 ID，即文件名
    pub id: String,
    /// 小端序 f32 数组
    pub vector: Vec<u8>,
    /// 向量维数，用于校验
    pub dim: i64,
    /// 生成该向量的提取器版本
    pub extractor_version: i64,
    /// 图片文件的 blake3 哈希
    pub hash: Vec<u8>,
}

/// 增量提取时用到的元数据，不含向量本身
#[derive(Debug, FromRow)]
pub struct FeatureMetaRecord {
    pub id: String,
    pub extractor_version: i64,
    pub hash: Vec<u8>,
}
