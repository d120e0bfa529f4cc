use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// 图片集合，每个集合有独立的特征提取器和特征表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Shapes,
    Textures,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Shapes, Collection::Textures];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Shapes => "shapes",
            Collection::Textures => "textures",
        }
    }

    /// 特征表名，只会是固定的两个值，可以直接拼接进 SQL
    pub fn table(self) -> &'static str {
        match self {
            Collection::Shapes => "shapes_features",
            Collection::Textures => "textures_features",
        }
    }

    /// 扫描目录时接受的图片后缀名
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Collection::Shapes => &["gif", "png", "jpg", "jpeg"],
            Collection::Textures => &["jpg", "jpeg", "png"],
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Collection::Shapes => 0,
            Collection::Textures => 1,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shapes" => Ok(Collection::Shapes),
            "textures" => Ok(Collection::Textures),
            _ => Err(Error::UnknownCollection(s.to_owned())),
        }
    }
}
