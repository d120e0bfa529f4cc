//! 纹理描述符：Gabor 滤波器组 + Tamura 特征 + 梯度方向直方图 + GLCM 统计量

use std::f32::consts::PI;

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::filter;
use imageproc::kernel::Kernel;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::integral_image::{integral_image, sum_image_pixels};
use rayon::prelude::*;

use super::Descriptor;
use super::stats::{euclidean, mean_std, normalize};

/// 算法修订号，修改描述符计算方式时递增
const REVISION: u32 = 2;

const GABOR_SCALES: usize = 4;
const GABOR_ORIENTATIONS: usize = 8;
const GABOR_KSIZE: usize = 21;
const GABOR_SIGMA: f32 = 3.0;
const GABOR_GAMMA: f32 = 0.5;

const TAMURA_KMAX: usize = 5;
const NUM_DIRECTION_BINS: usize = 16;

const GLCM_LEVELS: usize = 16;
const GLCM_DISTANCES: [usize; 3] = [1, 3, 5];
const GLCM_ANGLES: [f32; 4] = [0.0, PI / 4.0, PI / 2.0, 3.0 * PI / 4.0];
const GLCM_PROPS: usize = 5;

const NUM_GABOR: usize = GABOR_SCALES * GABOR_ORIENTATIONS * 2;
const NUM_TAMURA: usize = 3;
const NUM_GLCM: usize = GLCM_PROPS * 2;
pub const DIM: usize = NUM_GABOR + NUM_TAMURA + NUM_DIRECTION_BINS + NUM_GLCM;

#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    size: u32,
    /// 按行存放的 Gabor 核
    kernels: Vec<Vec<f32>>,
}

impl TextureDescriptor {
    /// * `size` - 提取前统一缩放到 `size x size`
    pub fn new(size: u32) -> Self {
        let mut kernels = Vec::with_capacity(GABOR_SCALES * GABOR_ORIENTATIONS);
        for scale in 0..GABOR_SCALES {
            let lambda = (1 << (scale + 2)) as f32;
            for orientation in 0..GABOR_ORIENTATIONS {
                let theta = orientation as f32 * PI / GABOR_ORIENTATIONS as f32;
                kernels.push(gabor_kernel(GABOR_KSIZE, GABOR_SIGMA, theta, lambda, GABOR_GAMMA));
            }
        }
        Self { size: size.max(8), kernels }
    }
}

impl Descriptor for TextureDescriptor {
    fn version(&self) -> u32 {
        (REVISION << 16) | (self.size & 0xffff)
    }

    fn dim(&self) -> usize {
        DIM
    }

    fn extract(&self, image: &GrayImage) -> Vec<f32> {
        let image = imageops::resize(image, self.size, self.size, FilterType::Triangle);

        let ksize = GABOR_KSIZE as u32;
        let gabor = self
            .kernels
            .par_iter()
            .map(|kernel| {
                let response: ImageBuffer<Luma<f32>, Vec<f32>> =
                    filter(&image, Kernel::new(kernel, ksize, ksize), |v| v);
                mean_std(response.as_raw())
            })
            .collect::<Vec<_>>();

        let (direction_hist, directionality) = tamura_directionality(&image);

        let mut vector = Vec::with_capacity(DIM);
        vector.extend(gabor.into_iter().flat_map(|(m, s)| [m, s]));
        vector.push(tamura_coarseness(&image));
        vector.push(tamura_contrast(&image));
        vector.push(directionality);
        vector.extend(direction_hist);
        vector.extend(glcm_features(&image));
        vector
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        let g = NUM_GABOR;
        let t = g + NUM_TAMURA;
        let d = t + NUM_DIRECTION_BINS;
        0.4 * euclidean(&a[..g], &b[..g]) / 10.0
            + 0.3 * euclidean(&a[g..t], &b[g..t]) / 5.0
            + 0.15 * euclidean(&a[t..d], &b[t..d])
            + 0.15 * euclidean(&a[d..], &b[d..]) / 2.0
    }

    fn similarity_scale(&self) -> f32 {
        5.0
    }
}

/// 与 OpenCV `getGaborKernel` 相同的实数 Gabor 核，相位为 0，按行展开
fn gabor_kernel(ksize: usize, sigma: f32, theta: f32, lambda: f32, gamma: f32) -> Vec<f32> {
    let half = (ksize / 2) as i32;
    let (sx, sy) = (sigma, sigma / gamma);
    let (s, c) = theta.sin_cos();
    let (ex, ey) = (-0.5 / (sx * sx), -0.5 / (sy * sy));
    let cscale = 2.0 * PI / lambda;

    let mut kernel = vec![0.0; ksize * ksize];
    for y in -half..=half {
        for x in -half..=half {
            let (xf, yf) = (x as f32, y as f32);
            let xr = xf * c + yf * s;
            let yr = -xf * s + yf * c;
            let v = (ex * xr * xr + ey * yr * yr).exp() * (cscale * xr).cos();
            kernel[(half - y) as usize * ksize + (half - x) as usize] = v;
        }
    }
    kernel
}

/// 粗糙度：每个像素取使相邻尺度均值差最大的窗口大小，再求平均
fn tamura_coarseness(image: &GrayImage) -> f32 {
    let (w, h) = image.dimensions();
    let integral = integral_image::<_, u32>(image);
    // 以 (x, y) 为中心、边长为 size 的窗口均值，超出边界的部分被裁掉
    let box_mean = |x: u32, y: u32, size: u32| -> f32 {
        let before = size / 2;
        let after = size - before;
        let (x0, x1) = (x.saturating_sub(before), (x + after).min(w));
        let (y0, y1) = (y.saturating_sub(before), (y + after).min(h));
        let sum = sum_image_pixels(&integral, x0, y0, x1 - 1, y1 - 1)[0];
        sum as f32 / ((x1 - x0) * (y1 - y0)) as f32
    };

    let mut total = 0.0f64;
    for y in 0..h {
        for x in 0..w {
            let averages: [f32; TAMURA_KMAX] = std::array::from_fn(|k| box_mean(x, y, 1 << k));
            let mut best = (0, f32::MIN);
            for (k, pair) in averages.windows(2).enumerate() {
                let v = (pair[0] - pair[1]).abs();
                if v > best.1 {
                    best = (k, v);
                }
            }
            total += (1u32 << best.0) as f64;
        }
    }
    (total / (w * h) as f64) as f32
}

/// 对比度：σ / α4^(1/4)，α4 为峰度
fn tamura_contrast(image: &GrayImage) -> f32 {
    let values = image.pixels().map(|p| p[0] as f32).collect::<Vec<_>>();
    let (mean, std) = mean_std(&values);
    let var = std * std;
    if var == 0.0 {
        return 0.0;
    }
    let mu4 = values.iter().map(|&v| ((v - mean) as f64).powi(4)).sum::<f64>() / values.len() as f64;
    let alpha4 = mu4 / (var as f64 * var as f64);
    if alpha4 > 0.0 { (std as f64 / alpha4.powf(0.25)) as f32 } else { 0.0 }
}

/// 显著边缘的梯度方向直方图，以及它与均匀分布的偏离程度
fn tamura_directionality(image: &GrayImage) -> ([f32; NUM_DIRECTION_BINS], f32) {
    let (gx, gy) = (horizontal_sobel(image), vertical_sobel(image));
    let gradients = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(x, y)| (x[0] as f32, y[0] as f32))
        .collect::<Vec<_>>();
    let magnitudes = gradients.iter().map(|(x, y)| x.hypot(*y)).collect::<Vec<_>>();
    let (threshold, _) = mean_std(&magnitudes);

    let mut hist = [0.0; NUM_DIRECTION_BINS];
    for (&(x, y), &m) in gradients.iter().zip(&magnitudes) {
        if m > threshold {
            let angle = y.atan2(x).to_degrees().rem_euclid(180.0);
            let bin = ((angle / (180.0 / NUM_DIRECTION_BINS as f32)) as usize).min(NUM_DIRECTION_BINS - 1);
            hist[bin] += 1.0;
        }
    }
    normalize(&mut hist);

    let uniform = 1.0 / NUM_DIRECTION_BINS as f32;
    let directionality = hist.iter().map(|h| (h - uniform) * (h - uniform)).sum();
    (hist, directionality)
}

/// 灰度共生矩阵，返回 5 种统计量在所有距离和角度上的均值与标准差
fn glcm_features(image: &GrayImage) -> [f32; NUM_GLCM] {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let level = |x: i64, y: i64| image.get_pixel(x as u32, y as u32)[0] as usize * GLCM_LEVELS / 256;

    let mut props: [Vec<f32>; GLCM_PROPS] = Default::default();
    for distance in GLCM_DISTANCES {
        for angle in GLCM_ANGLES {
            let dx = (angle.cos() * distance as f32).round() as i64;
            let dy = -(angle.sin() * distance as f32).round() as i64;

            let mut glcm = [[0f64; GLCM_LEVELS]; GLCM_LEVELS];
            for y in 0..h {
                for x in 0..w {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let (i, j) = (level(x, y), level(nx, ny));
                    // 对称矩阵
                    glcm[i][j] += 1.0;
                    glcm[j][i] += 1.0;
                }
            }
            let total = glcm.iter().flatten().sum::<f64>();
            if total > 0.0 {
                glcm.iter_mut().flatten().for_each(|v| *v /= total);
            }

            for (p, v) in props.iter_mut().zip(glcm_props(&glcm)) {
                p.push(v as f32);
            }
        }
    }

    let mut features = [0.0; NUM_GLCM];
    for (i, values) in props.iter().enumerate() {
        let (m, s) = mean_std(values);
        features[2 * i] = m;
        features[2 * i + 1] = s;
    }
    features
}

/// contrast, dissimilarity, homogeneity, energy, correlation
fn glcm_props(p: &[[f64; GLCM_LEVELS]; GLCM_LEVELS]) -> [f64; GLCM_PROPS] {
    let (mut contrast, mut dissimilarity, mut homogeneity, mut asm) = (0.0, 0.0, 0.0, 0.0);
    let (mut mu_i, mut mu_j) = (0.0, 0.0);
    for (i, row) in p.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            let d = i as f64 - j as f64;
            contrast += v * d * d;
            dissimilarity += v * d.abs();
            homogeneity += v / (1.0 + d * d);
            asm += v * v;
            mu_i += i as f64 * v;
            mu_j += j as f64 * v;
        }
    }

    let (mut var_i, mut var_j, mut cov) = (0.0, 0.0, 0.0);
    for (i, row) in p.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            let (di, dj) = (i as f64 - mu_i, j as f64 - mu_j);
            var_i += v * di * di;
            var_j += v * dj * dj;
            cov += v * di * dj;
        }
    }
    // 灰度单一时相关性没有定义，按完全相关处理
    let correlation = if var_i < 1e-15 || var_j < 1e-15 { 1.0 } else { cov / (var_i * var_j).sqrt() };

    [contrast, dissimilarity, homogeneity, asm.sqrt(), correlation]
}
