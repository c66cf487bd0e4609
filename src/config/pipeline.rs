//! Windowing, split and evaluation defaults

/// The Master Pipeline Configuration
#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
    /// Number of past axis positions fed to the classifier per sample.
    pub lookback_length: usize,
    /// Number of future axis positions labeled per sample.
    pub horizon_length: usize,
    /// Share of samples (taken from the front, oldest first) that go to training.
    pub train_fraction: f64,
    /// Probabilities strictly above this classify as "up".
    pub decision_threshold: f64,
}

pub const PIPELINE: PipelineConfig = PipelineConfig {
    lookback_length: 12,
    horizon_length: 3,
    train_fraction: 0.8,
    decision_threshold: 0.5,
};

/// Defaults handed to the classifier collaborator.
#[derive(Clone, Copy, Debug)]
pub struct TrainingConfig {
    pub epoch_count: usize,
    pub batch_size: usize,
}

pub const TRAINING: TrainingConfig = TrainingConfig {
    epoch_count: 10,
    batch_size: 32,
};
