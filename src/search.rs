use std::cmp::Ordering;
use std::path::PathBuf;

use serde::Serialize;

use crate::collection::Collection;
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};

/// 一次搜索请求
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub collection: Collection,
    pub query_id: String,
    pub top_k: i64,
}

impl SearchQuery {
    pub fn new(collection: Collection, query_id: impl Into<String>, top_k: i64) -> Self {
        Self { collection, query_id: query_id.into(), top_k }
    }

    /// 校验 top_k 并转换为 usize
    pub fn top_k(&self) -> Result<usize> {
        if self.top_k <= 0 {
            return Err(Error::InvalidTopK(self.top_k));
        }
        Ok(self.top_k as usize)
    }
}

/// 单条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub path: PathBuf,
    pub distance: f32,
    /// 相似度，范围 [0, 100]
    pub similarity: f32,
}

/// 把距离换算为 [0, 100] 的相似度：`100 * exp(-d / scale)`
///
/// 距离为 0 时为 100，随距离严格递减
pub fn similarity(distance: f32, scale: f32) -> f32 {
    if !distance.is_finite() {
        return 0.0;
    }
    (100.0 * (-distance.max(0.0) as f64 / scale as f64).exp()).clamp(0.0, 100.0) as f32
}

/// 对候选向量做穷举搜索，返回按距离升序排列的 `(id, distance)`
///
/// 距离相同时按 ID 字典序排列，查询图片本身不会出现在结果中
pub fn rank<'a, D, I>(
    descriptor: &D,
    query_id: &str,
    query: &[f32],
    candidates: I,
    top_k: usize,
) -> Vec<(&'a str, f32)>
where
    D: Descriptor + ?Sized,
    I: IntoIterator<Item = (&'a str, &'a [f32])>,
{
    let mut scored = candidates
        .into_iter()
        .filter(|(id, _)| *id != query_id)
        .map(|(id, vector)| (id, descriptor.distance(query, vector)))
        .collect::<Vec<_>>();
    scored.sort_unstable_by(|a, b| match a.1.total_cmp(&b.1) {
        Ordering::Equal => a.0.cmp(b.0),
        ord => ord,
    });
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use image::GrayImage;

    use super::*;

    /// 直接使用欧氏距离的测试描述符
    struct Plain;

    impl Descriptor for Plain {
        fn version(&self) -> u32 {
            1
        }

        fn dim(&self) -> usize {
            1
        }

        fn extract(&self, _image: &GrayImage) -> Vec<f32> {
            vec![0.0]
        }

        fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
            (a[0] - b[0]).abs()
        }

        fn similarity_scale(&self) -> f32 {
            10.0
        }
    }

    fn candidates() -> Vec<(String, Vec<f32>)> {
        vec![
            ("q".to_owned(), vec![0.0]),
            ("d".to_owned(), vec![3.0]),
            ("b".to_owned(), vec![1.0]),
            ("a".to_owned(), vec![-1.0]),
            ("c".to_owned(), vec![2.0]),
        ]
    }

    #[test]
    fn test_rank_order_and_ties() {
        let data = candidates();
        let iter = data.iter().map(|(id, v)| (id.as_str(), v.as_slice()));
        let result = rank(&Plain, "q", &[0.0], iter, 10);
        let ids = result.iter().map(|r| r.0).collect::<Vec<_>>();
        assert_eq!(ids, ["a", "b", "c", "d"]);
        assert!(result.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_rank_clamps_top_k() {
        let data = candidates();
        let iter = data.iter().map(|(id, v)| (id.as_str(), v.as_slice()));
        assert_eq!(rank(&Plain, "q", &[0.0], iter, 2).len(), 2);
        let iter = data.iter().map(|(id, v)| (id.as_str(), v.as_slice()));
        assert_eq!(rank(&Plain, "q", &[0.0], iter, 6).len(), 4);
    }

    #[test]
    fn test_rank_only_query() {
        let data = vec![("q".to_owned(), vec![0.0])];
        let iter = data.iter().map(|(id, v)| (id.as_str(), v.as_slice()));
        assert!(rank(&Plain, "q", &[0.0], iter, 3).is_empty());
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity(0.0, 10.0), 100.0);
        let mut last = 100.0;
        for d in [0.01, 0.5, 1.0, 5.0, 20.0, 100.0] {
            let s = similarity(d, 10.0);
            assert!(s < last);
            assert!((0.0..=100.0).contains(&s));
            last = s;
        }
        assert_eq!(similarity(f32::INFINITY, 10.0), 0.0);
        assert!(similarity(1e9, 10.0) >= 0.0);
    }

    #[test]
    fn test_invalid_top_k() {
        let q = SearchQuery::new(Collection::Shapes, "a.png", 0);
        assert!(matches!(q.top_k(), Err(Error::InvalidTopK(0))));
        let q = SearchQuery::new(Collection::Shapes, "a.png", -3);
        assert!(matches!(q.top_k(), Err(Error::InvalidTopK(-3))));
        let q = SearchQuery::new(Collection::Shapes, "a.png", 6);
        assert_eq!(q.top_k().unwrap(), 6);
    }
}
