pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::AppConfig;
#[cfg(feature = "cli")]
pub use config::cli::Cli;

pub use crate::core::{filesystem::FileSystem, registry::Registry};
pub use domain::model::{
    ConfigSpec, Operation, Options, Payload, Phase, StrategySpec, Upload, WriteReturns, Written,
};
pub use domain::ports::{Adapter, Filter, Rejection, Strategy};
pub use utils::error::{FileSystemError, Result};
