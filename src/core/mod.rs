pub mod engine;
pub mod pipeline;
pub mod prompt;
pub mod reply;
pub mod report;
pub mod splitter;

pub use crate::domain::model::{
    MeasureRecord, OptimizationOutcome, OptimizationSections, OptimizedMeasure, RunSummary,
};
pub use crate::domain::ports::{
    CompletionClient, CompletionRequest, ConfigProvider, Pipeline, Storage,
};
pub use crate::utils::error::Result;
