use std::path::{Path, PathBuf};

use log::{debug, warn};
use regex::Regex;
use walkdir::WalkDir;

use crate::collection::Collection;
use crate::error::{Error, Result};

/// 图片记录，ID 即文件名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub collection: Collection,
    pub id: String,
    pub path: PathBuf,
}

/// 图片集合目录，每次调用都会重新扫描
#[derive(Debug, Clone)]
pub struct Registry {
    dirs: [PathBuf; 2],
    suffix: [Regex; 2],
}

impl Registry {
    pub fn new(shapes_dir: impl Into<PathBuf>, textures_dir: impl Into<PathBuf>) -> Self {
        let suffix = Collection::ALL.map(|c| {
            let re = format!("(?i)^({})$", c.extensions().join("|"));
            Regex::new(&re).expect("failed to build regex")
        });
        Self { dirs: [shapes_dir.into(), textures_dir.into()], suffix }
    }

    /// 集合对应的图片目录
    pub fn dir(&self, collection: Collection) -> &Path {
        &self.dirs[collection.index()]
    }

    /// 文件扩展名是否属于该集合
    pub fn accepts(&self, collection: Collection, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .is_some_and(|ext| self.suffix[collection.index()].is_match(&ext.to_string_lossy()))
    }

    /// 列出集合中的所有图片，按文件名排序，符号链接会被跟随
    pub fn list(&self, collection: Collection) -> Result<Vec<ImageRecord>> {
        let dir = self.dir(collection);

        let mut records = vec![];
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                // 失效的符号链接之类的单个条目直接跳过
                Err(e) if e.depth() > 0 => {
                    warn!("跳过无法读取的文件: {e}");
                    continue;
                }
                Err(e) => {
                    let source = e.into_io_error().unwrap_or_else(|| std::io::Error::other("walkdir"));
                    return Err(Error::Registry { path: dir.to_path_buf(), source });
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            if !self.accepts(collection, &id) {
                continue;
            }
            records.push(ImageRecord { collection, id, path: entry.path().to_path_buf() });
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));

        debug!("扫描 {} 完成，共 {} 张图片", dir.display(), records.len());
        Ok(records)
    }
}
