use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum_typed_multipart::{TypedMultipart, TypedMultipartError};
use log::info;

use super::error::ApiError;
use super::state::AppState;
use super::types::*;
use crate::collection::Collection;
use crate::metrics;
use crate::search::SearchQuery;

type Result<T> = std::result::Result<T, ApiError>;

/// 列出集合中的图片
#[utoipa::path(
    get,
    path = "/api/images/{collection}",
    params(("collection" = String, Path, description = "shapes 或 textures")),
    responses(
        (status = 200, body = Vec<String>),
        (status = 400, body = ErrorResponse),
    )
)]
pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<String>>> {
    let collection = collection.parse::<Collection>()?;
    let images = state.engine.list(collection)?;
    Ok(Json(images.into_iter().map(|r| r.id).collect()))
}

/// 提取集合中所有图片的特征
#[utoipa::path(
    post,
    path = "/api/extract/{collection}",
    params(
        ("collection" = String, Path, description = "shapes 或 textures"),
        ("force" = Option<bool>, Query, description = "清空后全部重新提取"),
    ),
    responses(
        (status = 200, body = ExtractResponse),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
    )
)]
pub async fn extract_handler(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    params: std::result::Result<Query<ExtractParams>, QueryRejection>,
) -> Result<Json<ExtractResponse>> {
    let collection = collection.parse::<Collection>()?;
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    info!("收到提取请求: {}", collection);

    let summary = state.engine.extract(collection, params.force).await?;
    let mut message =
        format!("已提取 {} 张图片的特征，失败 {} 张", summary.succeeded, summary.failed.len());
    if summary.cancelled {
        message.push_str("，任务被取消");
    }

    Ok(Json(ExtractResponse { success: true, message, summary }))
}

/// 上传一张图片到集合并提取特征
#[utoipa::path(
    post,
    path = "/api/upload/{collection}",
    params(("collection" = String, Path, description = "shapes 或 textures")),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = UploadResponse),
        (status = 400, body = ErrorResponse),
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    data: std::result::Result<TypedMultipart<UploadRequest>, TypedMultipartError>,
) -> Result<Json<UploadResponse>> {
    let collection = collection.parse::<Collection>()?;
    let TypedMultipart(UploadRequest { file }) = data.map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let Some(file_name) = file.metadata.file_name.filter(|name| !name.is_empty()) else {
        return Err(ApiError::BadRequest("文件名不能为空".to_owned()));
    };
    info!("收到上传请求: {} -> {}", file_name, collection);

    let filename = state.engine.upload(collection, &file_name, file.contents.to_vec()).await?;
    let message = format!("已保存 {} 并提取特征", filename);
    Ok(Json(UploadResponse { success: true, filename, message }))
}

/// 搜索与指定图片最相似的图片
#[utoipa::path(
    post,
    path = "/api/search/{collection}",
    params(("collection" = String, Path, description = "shapes 或 textures")),
    request_body = SearchRequest,
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    body: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>> {
    let collection = collection.parse::<Collection>()?;
    let Json(data) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let image = match data.image {
        Some(image) if !image.is_empty() => image,
        _ => return Err(ApiError::BadRequest("未指定查询图片".to_owned())),
    };

    let query = SearchQuery::new(collection, image, data.top_k.unwrap_or(state.default_top_k));
    let results = state.engine.search(&query).await?;

    let results = results
        .into_iter()
        .map(|r| SearchItem {
            path: format!("/images/{}/{}", collection, r.id),
            name: r.id,
            distance: r.distance,
            similarity: r.similarity,
        })
        .collect();

    Ok(Json(SearchResponse { success: true, query: query.query_id, results }))
}

/// Prometheus 指标
pub async fn metrics_handler() -> String {
    metrics::gather_text()
}
