#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;

use cbir::config::{ConfDir, ExtractOptions};
use cbir::registry::Registry;
use cbir::{Engine, EngineBuilder};
use image::{GrayImage, ImageFormat, Luma};
use tempfile::TempDir;

pub const SIZE: u32 = 64;

/// 测试用的数据目录和配置目录
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("data/shapes")).unwrap();
        fs::create_dir_all(root.path().join("data/textures")).unwrap();
        Self { root }
    }

    /// 三张基础形状图片
    pub fn with_shapes() -> Self {
        let ws = Self::new();
        ws.save_shape("circle.png", &circle(14));
        ws.save_shape("square.png", &square(30));
        ws.save_shape("triangle.png", &triangle(40));
        ws
    }

    /// 三张条纹纹理图片
    pub fn with_textures() -> Self {
        let ws = Self::new();
        ws.save_texture("horizontal.png", &stripes(true, 8));
        ws.save_texture("vertical.png", &stripes(false, 8));
        ws.save_texture("fine.png", &stripes(true, 4));
        ws
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join("data")
    }

    pub fn conf_dir(&self) -> PathBuf {
        self.root.path().join("conf")
    }

    pub fn shapes_dir(&self) -> PathBuf {
        self.data_dir().join("shapes")
    }

    pub fn textures_dir(&self) -> PathBuf {
        self.data_dir().join("textures")
    }

    pub fn save_shape(&self, name: &str, image: &GrayImage) {
        image.save(self.shapes_dir().join(name)).unwrap();
    }

    pub fn save_texture(&self, name: &str, image: &GrayImage) {
        image.save(self.textures_dir().join(name)).unwrap();
    }

    pub fn registry(&self) -> Registry {
        Registry::new(self.shapes_dir(), self.textures_dir())
    }

    pub async fn engine(&self) -> Engine {
        self.engine_with(fast_options()).await
    }

    pub async fn engine_with(&self, options: ExtractOptions) -> Engine {
        EngineBuilder::new(ConfDir::new(self.conf_dir()), self.registry())
            .extract_options(options)
            .open()
            .await
            .unwrap()
    }
}

/// 缩小纹理尺寸，避免测试过慢
pub fn fast_options() -> ExtractOptions {
    ExtractOptions { timeout: Duration::from_secs(60), jobs: 2, texture_size: 32, shape_max_size: 128 }
}

/// 编码为 PNG 文件内容
pub fn png_bytes(image: &GrayImage) -> Vec<u8> {
    let mut buf = Cursor::new(vec![]);
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn canvas(f: impl Fn(i64, i64) -> bool) -> GrayImage {
    GrayImage::from_fn(SIZE, SIZE, |x, y| if f(x as i64, y as i64) { Luma([255]) } else { Luma([0]) })
}

pub fn circle(radius: i64) -> GrayImage {
    canvas(|x, y| (x - 32) * (x - 32) + (y - 32) * (y - 32) <= radius * radius)
}

pub fn square(side: i64) -> GrayImage {
    canvas(|x, y| (x - 32).abs() <= side / 2 && (y - 32).abs() <= side / 2)
}

pub fn triangle(side: i64) -> GrayImage {
    canvas(|x, y| {
        let dy = y - (32 - side / 2);
        (0..=side).contains(&dy) && (x - 32).abs() * 2 <= dy
    })
}

pub fn stripes(horizontal: bool, period: u32) -> GrayImage {
    GrayImage::from_fn(SIZE, SIZE, |x, y| {
        let t = if horizontal { y } else { x };
        if (t / (period / 2)) % 2 == 0 { Luma([40]) } else { Luma([210]) }
    })
}
