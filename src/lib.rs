pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::pipelines::TranslatePipeline;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{engine::ClearportEngine, mapping::PackageMapping, run::TranslationRun};
pub use utils::error::{ClearportError, Result};
