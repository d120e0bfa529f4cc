use std::sync::LazyLock;

use prometheus::*;

static METRIC_EXTRACT_IMAGE_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "cbir_extract_image_count",
        "count of the images processed by extraction jobs",
        &["collection", "status"]
    )
    .unwrap()
});

static METRIC_SEARCH_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "cbir_search_duration",
        "duration of the per-query search in seconds",
        &["collection"]
    )
    .unwrap()
});

static METRIC_SEARCH_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "cbir_search_count",
        "count of the search requests",
        &["collection", "status"]
    )
    .unwrap()
});

/// 记录一张图片的提取结果，status 为 extracted / reused / failed
pub fn inc_extract_count(collection: &str, status: &str) {
    METRIC_EXTRACT_IMAGE_COUNT.with_label_values(&[collection, status]).inc();
}

pub fn inc_search_duration(collection: &str, duration: f32) {
    METRIC_SEARCH_DURATION.with_label_values(&[collection]).observe(duration as f64);
}

pub fn inc_search_count(collection: &str, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    METRIC_SEARCH_COUNT.with_label_values(&[collection, status]).inc();
}

/// 以文本格式导出所有指标
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    encoder.encode_to_string(&prometheus::gather()).unwrap_or_default()
}
