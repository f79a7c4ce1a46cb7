pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::http::ChatCompletionClient;
pub use crate::config::{cli::LocalStorage, OptimizerConfig};
pub use crate::core::engine::{run_optimizer, OptimizerEngine};
pub use crate::core::pipeline::DaxPipeline;
pub use crate::domain::model::{PromptStyle, ReportFormat};
pub use crate::utils::error::{OptimizerError, Result};
