pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod output;
pub mod utils;

pub use adapters::{LocalStorage, SupabaseClient};
pub use config::TomlConfig;
#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use core::etl::EtlEngine;
pub use utils::error::{EtlError, Result};
