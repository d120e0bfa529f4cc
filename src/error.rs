use std::path::PathBuf;

use thiserror::Error;

use crate::collection::Collection;

/// 检索引擎的错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 未知的集合名称
    #[error("未知的图片集合: {0}")]
    UnknownCollection(String),

    /// 单张图片的特征提取失败，任务会跳过并继续
    #[error("提取特征失败 {id}: {reason}")]
    ExtractionFailed { id: String, reason: String },

    /// 上传的文件名不是集合支持的图片格式
    #[error("不支持的图片格式: {0}")]
    UnsupportedFormat(String),

    /// 查询图片尚未提取特征
    #[error("图片 {0} 尚未提取特征，请先运行特征提取")]
    QueryNotIndexed(String),

    /// 非法的 top_k 参数
    #[error("top_k 必须为正整数，当前为 {0}")]
    InvalidTopK(i64),

    /// 集合中没有任何图片
    #[error("集合 {0} 中没有任何图片")]
    EmptyCollection(Collection),

    /// 图片目录无法读取
    #[error("无法读取图片目录 {}: {source}", path.display())]
    Registry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 特征库读写失败
    #[error("特征库读写失败: {0}")]
    StoreIo(#[from] sqlx::Error),

    /// 数据库迁移失败
    #[error("数据库迁移失败: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// 导出的特征矩阵形状不一致
    #[error("特征矩阵形状错误: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, Error>;
