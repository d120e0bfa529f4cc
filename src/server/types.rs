use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::job::JobSummary;

/// 搜索请求参数
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    /// 查询图片的文件名，必须已在集合中并提取过特征
    pub image: Option<String>,
    /// 返回的结果数量，默认 6
    pub top_k: Option<i64>,
}

/// 单条搜索结果
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchItem {
    /// 图片文件名
    pub name: String,
    /// 图片访问路径
    pub path: String,
    pub distance: f32,
    /// 相似度，范围 [0, 100]
    pub similarity: f32,
}

/// 搜索响应
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub success: bool,
    /// 查询图片的文件名
    pub query: String,
    /// 按距离升序排列的结果
    pub results: Vec<SearchItem>,
}

/// 特征提取响应
#[derive(Debug, Serialize, ToSchema)]
pub struct ExtractResponse {
    pub success: bool,
    pub message: String,
    #[schema(value_type = Object)]
    pub summary: JobSummary,
}

/// 特征提取的可选参数
#[derive(Debug, Default, Deserialize)]
pub struct ExtractParams {
    /// 清空后全部重新提取
    #[serde(default)]
    pub force: bool,
}

/// 上传图片的请求
#[derive(TryFromMultipart)]
pub struct UploadRequest {
    pub file: FieldData<Bytes>,
}

/// 上传表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct UploadForm {
    /// 上传的图片文件，文件名即图片 ID
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// 上传响应
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    /// 保存后的图片文件名，可直接用于搜索
    pub filename: String,
    pub message: String,
}

/// 错误响应
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
