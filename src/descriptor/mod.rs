mod stats;
pub mod shape;
pub mod texture;

use image::GrayImage;

pub use shape::ShapeDescriptor;
pub use texture::TextureDescriptor;

use crate::collection::Collection;
use crate::config::ExtractOptions;

/// 图片到定长向量的映射，以及该向量空间上的距离
pub trait Descriptor {
    /// 提取器版本，算法或参数变化时必须改变
    fn version(&self) -> u32;

    /// 输出向量的长度
    fn dim(&self) -> usize;

    /// 提取描述符，对同一版本必须是确定性的
    fn extract(&self, image: &GrayImage) -> Vec<f32>;

    /// 两个描述符之间的距离，非负
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;

    /// 距离换算相似度时使用的尺度
    fn similarity_scale(&self) -> f32;
}

/// 按集合选择的描述符
#[derive(Debug, Clone)]
pub enum Extractor {
    Shape(ShapeDescriptor),
    Texture(TextureDescriptor),
}

impl Extractor {
    pub fn for_collection(collection: Collection, opts: &ExtractOptions) -> Self {
        match collection {
            Collection::Shapes => Extractor::Shape(ShapeDescriptor::new(opts.shape_max_size)),
            Collection::Textures => Extractor::Texture(TextureDescriptor::new(opts.texture_size)),
        }
    }

    fn inner(&self) -> &dyn Descriptor {
        match self {
            Extractor::Shape(d) => d,
            Extractor::Texture(d) => d,
        }
    }

    /// 解码图片并提取描述符
    pub fn extract_bytes(&self, bytes: &[u8]) -> image::ImageResult<Vec<f32>> {
        let image = image::load_from_memory(bytes)?.to_luma8();
        Ok(self.extract(&image))
    }
}

impl Descriptor for Extractor {
    fn version(&self) -> u32 {
        self.inner().version()
    }

    fn dim(&self) -> usize {
        self.inner().dim()
    }

    fn extract(&self, image: &GrayImage) -> Vec<f32> {
        self.inner().extract(image)
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        self.inner().distance(a, b)
    }

    fn similarity_scale(&self) -> f32 {
        self.inner().similarity_scale()
    }
}
