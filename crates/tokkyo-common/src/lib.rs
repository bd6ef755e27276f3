//! tokkyo-common — Shared error type and run configuration for all tokkyo crates.

pub mod error;
pub mod pipeline_config;

// Re-export commonly used types
pub use error::{Result, TokkyoError};
pub use pipeline_config::{
    DatasetConfig, DescriptionSource, ExecutionConfig, ExtractionConfig, LegacyDatasetLimits,
    NoiseConfig, NormaliseConfig, OutputConfig, PipelineConfig, RunMode, ValidationConfig,
};
