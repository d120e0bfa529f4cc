//! 形状描述符：Fourier 描述子 + 边界方向直方图 + Hu 不变矩
//!
//! 前景取 Otsu 二值化后像素较少的一类，再取其中面积最大的 8 连通区域，
//! 它的外轮廓统一为顺时针方向。

use std::cmp::Reverse;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::contrast::otsu_level;
use imageproc::region_labelling::{Connectivity, connected_components};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

use super::Descriptor;
use super::stats::{euclidean, normalize};

/// 算法修订号，修改描述符计算方式时递增
const REVISION: u32 = 2;

pub const NUM_FOURIER: usize = 20;
pub const NUM_DIRECTION_BINS: usize = 36;
pub const NUM_HU: usize = 7;
pub const DIM: usize = NUM_FOURIER + NUM_DIRECTION_BINS + NUM_HU;

/// 计算边界方向时相隔的轮廓点数
const DIRECTION_STEP: usize = 3;

#[derive(Debug, Clone)]
pub struct ShapeDescriptor {
    max_size: u32,
}

impl ShapeDescriptor {
    /// * `max_size` - 图片最长边超过该值时等比缩小
    pub fn new(max_size: u32) -> Self {
        Self { max_size: max_size.max(1) }
    }
}

impl Descriptor for ShapeDescriptor {
    fn version(&self) -> u32 {
        (REVISION << 16) | (self.max_size & 0xffff)
    }

    fn dim(&self) -> usize {
        DIM
    }

    fn extract(&self, image: &GrayImage) -> Vec<f32> {
        let image = limit_size(image, self.max_size);
        let region = Region::largest_foreground(&image);
        let contour = region.as_ref().map(|r| r.contour.as_slice()).unwrap_or_default();

        let mut vector = Vec::with_capacity(DIM);
        vector.extend(fourier_descriptors(contour));
        vector.extend(direction_histogram(contour));
        let hu = region.as_ref().map(Region::hu_moments).unwrap_or([0.0; NUM_HU]);
        vector.extend(hu.iter().map(|h| (h.abs() + 1e-10).ln() as f32));
        vector
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        let (f, d) = (NUM_FOURIER, NUM_FOURIER + NUM_DIRECTION_BINS);
        0.5 * euclidean(&a[..f], &b[..f])
            + 0.3 * euclidean(&a[f..d], &b[f..d])
            + 0.2 * euclidean(&a[d..], &b[d..])
    }

    fn similarity_scale(&self) -> f32 {
        10.0
    }
}

fn limit_size(image: &GrayImage, max_size: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w.max(h) <= max_size {
        return image.clone();
    }
    let scale = max_size as f64 / w.max(h) as f64;
    let (nw, nh) = (((w as f64 * scale) as u32).max(1), ((h as f64 * scale) as u32).max(1));
    imageops::resize(image, nw, nh, FilterType::Triangle)
}

/// 二值图中的一个连通区域
struct Region {
    pixels: Vec<(i32, i32)>,
    /// 顺时针排列的外轮廓
    contour: Vec<(i32, i32)>,
}

impl Region {
    fn largest_foreground(image: &GrayImage) -> Option<Self> {
        let (width, height) = image.dimensions();
        let t = otsu_level(image);
        let dark = image.pixels().filter(|p| p[0] <= t).count();
        // 物体通常比背景小
        let dark_is_fg = dark * 2 <= image.pixels().len();
        let binary = GrayImage::from_fn(width, height, |x, y| {
            let fg = (image.get_pixel(x, y)[0] <= t) == dark_is_fg;
            Luma([if fg { 255 } else { 0 }])
        });

        let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));
        let num_labels = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
        let mut areas = vec![0usize; num_labels + 1];
        for p in labels.pixels() {
            areas[p[0] as usize] += 1;
        }
        // 面积相同时取扫描顺序靠前的区域
        let label = (1..=num_labels).max_by_key(|&l| (areas[l], Reverse(l)))? as u32;

        let pixels = labels
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] == label)
            .map(|(x, y, _)| (x as i32, y as i32))
            .collect::<Vec<_>>();

        let mask = GrayImage::from_fn(width, height, |x, y| {
            Luma([if labels.get_pixel(x, y)[0] == label { 255 } else { 0 }])
        });
        let outer = find_contours::<i32>(&mask)
            .into_iter()
            .find(|c| matches!(c.border_type, BorderType::Outer))?;
        let mut contour = outer.points.into_iter().map(|p| (p.x, p.y)).collect::<Vec<_>>();
        if signed_area(&contour) < 0 {
            contour.reverse();
        }
        Some(Self { pixels, contour })
    }

    fn hu_moments(&self) -> [f64; NUM_HU] {
        let m00 = self.pixels.len() as f64;
        let (sx, sy) = self.pixels.iter().fold((0.0, 0.0), |(sx, sy), &(x, y)| {
            (sx + x as f64, sy + y as f64)
        });
        let (cx, cy) = (sx / m00, sy / m00);

        let mu = |p: i32, q: i32| -> f64 {
            self.pixels
                .iter()
                .map(|&(x, y)| (x as f64 - cx).powi(p) * (y as f64 - cy).powi(q))
                .sum::<f64>()
        };
        let eta = |p: i32, q: i32| mu(p, q) / m00.powf(1.0 + (p + q) as f64 / 2.0);

        let (n20, n02, n11) = (eta(2, 0), eta(0, 2), eta(1, 1));
        let (n30, n03, n21, n12) = (eta(3, 0), eta(0, 3), eta(2, 1), eta(1, 2));

        let a = n30 + n12;
        let b = n21 + n03;
        [
            n20 + n02,
            (n20 - n02).powi(2) + 4.0 * n11 * n11,
            (n30 - 3.0 * n12).powi(2) + (3.0 * n21 - n03).powi(2),
            a * a + b * b,
            (n30 - 3.0 * n12) * a * (a * a - 3.0 * b * b)
                + (3.0 * n21 - n03) * b * (3.0 * a * a - b * b),
            (n20 - n02) * (a * a - b * b) + 4.0 * n11 * a * b,
            (3.0 * n21 - n03) * a * (a * a - 3.0 * b * b)
                - (n30 - 3.0 * n12) * b * (3.0 * a * a - b * b),
        ]
    }
}

/// 轮廓的有向面积（鞋带公式的两倍），y 轴向下时顺时针为正
fn signed_area(contour: &[(i32, i32)]) -> i64 {
    let n = contour.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = contour[i];
            let (x1, y1) = contour[(i + 1) % n];
            x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
        })
        .sum()
}

/// 轮廓的 Fourier 系数幅值 `|F_k| / |F_1|`，k = 2..=21
///
/// 丢弃 F_0 消除平移，取幅值消除旋转和起点，除以 |F_1| 消除缩放
fn fourier_descriptors(contour: &[(i32, i32)]) -> [f32; NUM_FOURIER] {
    let mut desc = [0.0; NUM_FOURIER];
    let n = contour.len();
    if n < 3 {
        return desc;
    }

    let mut spectrum = contour
        .iter()
        .map(|&(x, y)| Complex::new(x as f64, y as f64))
        .collect::<Vec<_>>();
    FftPlanner::new().plan_fft_forward(n).process(&mut spectrum);

    let base = spectrum[1].norm();
    if base == 0.0 {
        return desc;
    }
    for (d, k) in desc.iter_mut().zip(2..n) {
        *d = (spectrum[k].norm() / base) as f32;
    }
    desc
}

/// 闭合轮廓上相隔 [`DIRECTION_STEP`] 个点的方向直方图
fn direction_histogram(contour: &[(i32, i32)]) -> [f32; NUM_DIRECTION_BINS] {
    let mut hist = [0.0; NUM_DIRECTION_BINS];
    let n = contour.len();
    if n < 2 {
        return hist;
    }
    let step = DIRECTION_STEP.min(n - 1);
    for i in 0..n {
        let (x0, y0) = contour[i];
        let (x1, y1) = contour[(i + step) % n];
        let angle = ((y1 - y0) as f64).atan2((x1 - x0) as f64).to_degrees().rem_euclid(360.0);
        let bin = ((angle / (360.0 / NUM_DIRECTION_BINS as f64)) as usize).min(NUM_DIRECTION_BINS - 1);
        hist[bin] += 1.0;
    }
    normalize(&mut hist);
    hist
}
