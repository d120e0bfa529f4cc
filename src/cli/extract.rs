use anyhow::{Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::Opts;
use crate::cli::{SubCommandExtend, open_engine};
use crate::collection::Collection;
use crate::config::ExtractOptions;

#[derive(Parser, Debug, Clone)]
pub struct ExtractCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    /// 图片集合：shapes 或 textures
    pub collection: Collection,
    /// 清空已有特征后全部重新提取
    #[arg(long)]
    pub force: bool,
}

impl SubCommandExtend for ExtractCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let mut engine = open_engine(opts, self.extract.clone()).await?;

        let pb = ProgressBar::no_length().with_style(pb_style());
        engine.set_progress(pb.clone());

        // Ctrl-C 时在两张图片之间停下，已写入的特征保持有效
        let cancel = engine.cancel_flag();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("收到中断信号，正在停止提取");
                cancel.cancel();
            }
        });

        let summary = engine.extract(self.collection, self.force).await?;
        pb.finish_with_message("特征提取完成");
        engine.close().await;

        info!(
            "尝试 {}，成功 {}（复用 {}），失败 {}，删除 {}",
            summary.attempted,
            summary.succeeded,
            summary.reused,
            summary.failed.len(),
            summary.removed
        );
        for id in &summary.failed {
            println!("[ERR] {}", id);
        }
        if summary.cancelled {
            bail!("提取被中断");
        }
        Ok(())
    }
}

fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .expect("failed to build progress style")
}
