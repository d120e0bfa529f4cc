use std::sync::Arc;

use crate::engine::Engine;

/// 应用状态
pub struct AppState {
    /// 检索引擎
    pub engine: Engine,
    /// 搜索请求未指定 top_k 时的默认值
    pub default_top_k: i64,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(engine: Engine, default_top_k: i64) -> Arc<Self> {
        Arc::new(AppState { engine, default_top_k })
    }
}
