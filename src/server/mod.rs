mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::error::ApiError;
pub use self::state::*;
pub use self::types::*;
use crate::collection::Collection;

#[derive(OpenApi)]
#[openapi(
    paths(api::list_handler, api::extract_handler, api::upload_handler, api::search_handler),
    components(schemas(
        types::SearchRequest,
        types::SearchResponse,
        types::ExtractResponse,
        types::UploadForm,
        types::UploadResponse
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/api/images/{collection}", get(api::list_handler))
        .route("/api/extract/{collection}", post(api::extract_handler))
        .route("/api/upload/{collection}", post(api::upload_handler))
        .route("/api/search/{collection}", post(api::search_handler))
        .route("/metrics", get(api::metrics_handler));

    // 图片本身直接从集合目录提供
    for collection in Collection::ALL {
        let dir = state.engine.registry().dir(collection).to_path_buf();
        router = router.nest_service(&format!("/images/{}", collection), ServeDir::new(dir));
    }

    router
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        // 上传限制：10M
        .layer(RequestBodyLimitLayer::new(1024 * 1024 * 10))
        .with_state(state)
}
