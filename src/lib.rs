pub mod cli;
pub mod collection;
pub mod config;
mod db;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod job;
mod metrics;
pub mod registry;
pub mod search;
pub mod server;
pub mod store;

pub use collection::Collection;
pub use config::Opts;
pub use engine::{Engine, EngineBuilder};
pub use error::{Error, Result};
