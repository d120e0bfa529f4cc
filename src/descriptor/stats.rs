//! 描述符用到的简单统计量

/// 均值与总体标准差
pub fn mean_std<'a>(values: impl IntoIterator<Item = &'a f32>) -> (f32, f32) {
    let (mut n, mut sum, mut sq) = (0usize, 0f64, 0f64);
    for &v in values {
        n += 1;
        sum += v as f64;
        sq += v as f64 * v as f64;
    }
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let var = (sq / n as f64 - mean * mean).max(0.0);
    (mean as f32, var.sqrt() as f32)
}

/// 欧氏距离
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

/// 把直方图归一化为和为 1，全零时保持不变
pub fn normalize(hist: &mut [f32]) {
    let sum = hist.iter().sum::<f32>();
    if sum > 0.0 {
        hist.iter_mut().for_each(|v| *v /= sum);
    }
}
