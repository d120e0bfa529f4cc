use anyhow::Result;
use clap::Parser;

use crate::Opts;
use crate::cli::SubCommandExtend;
use crate::collection::Collection;

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// 图片集合：shapes 或 textures
    pub collection: Collection,
}

impl SubCommandExtend for ListCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        for record in opts.data.registry().list(self.collection)? {
            println!("{}", record.id);
        }
        Ok(())
    }
}
