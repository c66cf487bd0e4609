//! Configuration module for the trend-windows pipeline.

// Can all be private because we have a public re-export.
mod debug;
mod persistence;
mod pipeline;

// Re-export commonly used items
pub use debug::{LOG_FLAGS, LogFlags};
pub use persistence::{PERSISTENCE, sample_cache_filename, scale_record_filename};
pub use pipeline::{PIPELINE, PipelineConfig, TRAINING, TrainingConfig};
