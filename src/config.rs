use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;
use crate::registry::Registry;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "", "cbir").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap_or(".")
}

#[derive(Args, Debug, Clone)]
pub struct ExtractOptions {
    /// 单张图片特征提取的超时时间，单位秒，可以是小数
    #[arg(long, value_name = "SECS", default_value = "30", value_parser = parse_timeout)]
    pub timeout: Duration,
    /// 同时提取特征的图片数量，默认为 CPU 核数
    #[arg(short, long, value_name = "N", default_value_t = num_cpus::get())]
    pub jobs: usize,
    /// 纹理特征提取前统一缩放到的边长，修改后需要 `extract --force`
    #[arg(long, value_name = "PIXELS", default_value_t = 256)]
    pub texture_size: u32,
    /// 形状图片最长边超过该值时等比缩小
    #[arg(long, value_name = "PIXELS", default_value_t = 512)]
    pub shape_max_size: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), jobs: num_cpus::get(), texture_size: 256, shape_max_size: 512 }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DataOptions {
    /// 图片数据目录，两个集合分别位于其下的 shapes 和 textures 子目录
    #[arg(short, long, global = true, default_value = "data")]
    pub data_dir: PathBuf,
    /// 单独指定形状图片目录
    #[arg(long, global = true, value_name = "DIR")]
    pub shapes_dir: Option<PathBuf>,
    /// 单独指定纹理图片目录
    #[arg(long, global = true, value_name = "DIR")]
    pub textures_dir: Option<PathBuf>,
}

impl DataOptions {
    pub fn registry(&self) -> Registry {
        let shapes = self.shapes_dir.clone().unwrap_or_else(|| self.data_dir.join("shapes"));
        let textures = self.textures_dir.clone().unwrap_or_else(|| self.data_dir.join("textures"));
        Registry::new(shapes, textures)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "cbir", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// cbir 配置文件目录，特征库保存在这里
    #[arg(short, long, global = true, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
    #[command(flatten)]
    pub data: DataOptions,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 列出集合中的图片
    List(ListCommand),
    /// 提取集合中所有图片的特征
    Extract(ExtractCommand),
    /// 在集合中搜索相似图片
    Search(SearchCommand),
    /// 启动 HTTP 服务
    Server(ServerCommand),
    /// 导出集合的特征矩阵
    Export(ExportCommand),
    /// 清空集合的特征
    Clean(CleanCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回特征库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("cbir.db")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

fn parse_timeout(s: &str) -> anyhow::Result<Duration> {
    let secs = s.parse::<f64>()?;
    if !(secs > 0.0) {
        return Err(anyhow::anyhow!("超时时间必须为正数: {}", s));
    }
    Ok(Duration::try_from_secs_f64(secs)?)
}
