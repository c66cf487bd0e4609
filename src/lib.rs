#![allow(clippy::collapsible_if)]
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]

// Core modules
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod models;
pub mod utils;

// Re-export commonly used types outside of crate (for the binaries and tests)
pub use config::{PERSISTENCE, PIPELINE, TRAINING};
pub use domain::{Field, Observation};
pub use engine::{
    CancelToken, ColumnFrequencyBaseline, PreparedDataset, RunOptions, RunReport,
    SequenceClassifier, run_pipeline,
};
pub use error::{PipelineError, PipelineResult, ReadError, StoreError};
pub use models::{EvaluationReport, SampleSet, WindowConfig};

// CLI argument parsing
use {clap::Parser, std::path::PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Long-form CSV with date, entity, open and close columns
    #[arg(long)]
    pub input: PathBuf,

    /// Past positions fed to the classifier per sample
    #[arg(long, default_value_t = PIPELINE.lookback_length)]
    pub lookback: usize,

    /// Future positions labeled per sample
    #[arg(long, default_value_t = PIPELINE.horizon_length)]
    pub horizon: usize,

    #[arg(long, default_value_t = TRAINING.epoch_count)]
    pub epochs: usize,

    #[arg(long, default_value_t = TRAINING.batch_size)]
    pub batch_size: usize,

    /// Write fitted scale parameters as JSON (default location if no path given)
    #[arg(long, num_args = 0..=1)]
    pub save_scale: Option<Option<PathBuf>>,

    /// Write the windowed samples as a bincode cache (default location if no path given)
    #[arg(long, num_args = 0..=1)]
    pub sample_cache: Option<Option<PathBuf>>,

    /// Print this many timeline rows per entity after the accuracy table
    #[arg(long, default_value_t = 0)]
    pub max_timeline: usize,
}

impl Cli {
    pub fn window(&self) -> PipelineResult<WindowConfig> {
        WindowConfig::new(self.lookback, self.horizon)
    }

    pub fn run_options(&self) -> PipelineResult<RunOptions> {
        Ok(RunOptions {
            window: self.window()?,
            train_fraction: PIPELINE.train_fraction,
            fit: engine::FitOptions {
                epoch_count: self.epochs,
                batch_size: self.batch_size,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_come_from_config() {
        let cli = Cli::parse_from(["trend-windows", "--input", "prices.csv"]);
        assert_eq!(cli.lookback, PIPELINE.lookback_length);
        assert_eq!(cli.horizon, PIPELINE.horizon_length);
        assert!(cli.save_scale.is_none());
        assert_eq!(cli.run_options().unwrap().fit.epoch_count, TRAINING.epoch_count);
    }

    #[test]
    fn bare_save_flag_means_default_location() {
        let cli = Cli::parse_from(["trend-windows", "--input", "p.csv", "--save-scale"]);
        assert_eq!(cli.save_scale, Some(None));
        assert!(cli.sample_cache.is_none());
    }

    #[test]
    fn zero_lookback_is_rejected() {
        let cli = Cli::parse_from(["trend-windows", "--input", "p.csv", "--lookback", "0"]);
        assert!(matches!(cli.window(), Err(PipelineError::InvalidConfig { .. })));
    }
}
