use std::convert::Infallible;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::cli::{SubCommandExtend, open_engine};
use crate::collection::Collection;
use crate::config::{ExtractOptions, Opts};
use crate::search::{SearchQuery, SearchResult};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    /// 图片集合：shapes 或 textures
    pub collection: Collection,
    /// 查询图片的文件名
    pub image: String,
    /// 显示的结果数量
    #[arg(short = 'k', long, value_name = "K", default_value_t = 6, allow_negative_numbers = true)]
    pub top_k: i64,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let engine = open_engine(opts, self.extract.clone()).await?;

        // 允许传入完整路径
        let image = std::path::Path::new(&self.image)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.image.clone());

        let query = SearchQuery::new(self.collection, image, self.top_k);
        let result = engine.search(&query).await;
        engine.close().await;

        print_result(&result?, self)
    }
}

fn print_result(result: &[SearchResult], opts: &SearchCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for (i, r) in result.iter().enumerate() {
                println!("{}. {:20}\t{:.6}\t{:.1}%", i + 1, r.id, r.distance, r.similarity);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone)]
pub enum OutputFormat {
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            _ => Ok(Self::Table),
        }
    }
}
