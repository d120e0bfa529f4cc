use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::{SubCommandExtend, open_engine};
use crate::collection::Collection;
use crate::config::{ExtractOptions, Opts};

#[derive(Parser, Debug, Clone)]
pub struct CleanCommand {
    /// 图片集合：shapes 或 textures
    pub collection: Collection,
}

impl SubCommandExtend for CleanCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let engine = open_engine(opts, ExtractOptions::default()).await?;
        info!("清理 {} 的特征……", self.collection);
        engine.clear(self.collection).await?;
        engine.close().await;
        info!("清理完成");
        Ok(())
    }
}
