mod clean;
mod export;
mod extract;
mod list;
mod search;
pub mod server;

pub use clean::*;
pub use export::*;
pub use extract::*;
pub use list::*;
pub use search::*;
pub use server::*;

use crate::config::{ExtractOptions, Opts};
use crate::engine::{Engine, EngineBuilder};

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 按全局配置打开检索引擎
async fn open_engine(opts: &Opts, extract: ExtractOptions) -> anyhow::Result<Engine> {
    let engine = EngineBuilder::new(opts.conf_dir.clone(), opts.data.registry())
        .extract_options(extract)
        .open()
        .await?;
    Ok(engine)
}
