mod classifier;
mod dataset;
mod run;

pub use {
    classifier::{
        CancelToken, ColumnFrequencyBaseline, EpochMetrics, FitOptions, SequenceClassifier,
        TrainingData, TrainingSummary,
    },
    dataset::PreparedDataset,
    run::{RunOptions, RunReport, run_pipeline},
};
