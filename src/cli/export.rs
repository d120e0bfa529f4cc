use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use ndarray_npy::write_npy;

use crate::cli::{SubCommandExtend, open_engine};
use crate::collection::Collection;
use crate::config::{ExtractOptions, Opts};

#[derive(Parser, Debug, Clone)]
pub struct ExportCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    /// 图片集合：shapes 或 textures
    pub collection: Collection,
    /// 输出文件，每行一个特征向量，行的顺序与标准输出中的 ID 一致
    #[arg(short, long, default_value = "features.npy")]
    pub output: PathBuf,
}

impl SubCommandExtend for ExportCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let engine = open_engine(opts, self.extract.clone()).await?;
        let (ids, data) = engine.export(self.collection).await?;
        engine.close().await;

        write_npy(&self.output, &data)?;
        for id in &ids {
            println!("{}", id);
        }
        info!("导出成功: {} 条特征 -> {}", ids.len(), self.output.display());
        Ok(())
    }
}
