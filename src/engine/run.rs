use {
    crate::{
        config::PIPELINE,
        engine::{
            classifier::{CancelToken, EpochMetrics, FitOptions, SequenceClassifier, TrainingData, TrainingSummary},
            dataset::PreparedDataset,
        },
        models::{
            EvaluationReport, WindowConfig, WindowStats, build_samples_with_stats, evaluate,
            split_chronological,
        },
        trace_time,
    },
    anyhow::{Context, Result, bail},
};

/// Knobs for one end-to-end run over a prepared dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub window: WindowConfig,
    pub train_fraction: f64,
    pub fit: FitOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            train_fraction: PIPELINE.train_fraction,
            fit: FitOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub classifier: &'static str,
    pub window: WindowConfig,
    pub window_stats: WindowStats,
    pub train_len: usize,
    pub test_len: usize,
    /// Share of "up" labels per entity over every sample, before the split.
    pub positive_rates: Vec<(String, f64)>,
    pub training: TrainingSummary,
    pub evaluation: EvaluationReport,
}

/// Window, split, fit on train (test doubles as validation), predict test, evaluate.
///
/// Large tensors only live for the duration of the fit/predict scope.
pub fn run_pipeline(
    dataset: &PreparedDataset,
    classifier: &mut dyn SequenceClassifier,
    options: &RunOptions,
    on_epoch_end: &mut dyn FnMut(&EpochMetrics),
    cancel: &CancelToken,
) -> Result<RunReport> {
    let (samples, window_stats) = trace_time!("Build samples", 5_000, {
        build_samples_with_stats(dataset.normalized(), &options.window)
    })?;
    let positive_rates = samples.positive_rates();
    let split = split_chronological(samples, options.train_fraction)?;

    let (training, mut evaluation) = {
        let train_inputs = split.train.inputs_tensor();
        let train_labels = split.train.label_matrix();
        let test_inputs = split.test.inputs_tensor();
        let test_labels = split.test.label_matrix();

        log::info!(
            "{}: fitting on {} sample(s), {} epoch(s), batch size {}",
            classifier.name(),
            split.train.len(),
            options.fit.epoch_count,
            options.fit.batch_size
        );
        let training = classifier
            .fit(
                TrainingData::new(train_inputs.view(), train_labels.view())?,
                Some(TrainingData::new(test_inputs.view(), test_labels.view())?),
                &options.fit,
                on_epoch_end,
                cancel,
            )
            .with_context(|| format!("{} failed to fit", classifier.name()))?;

        if training.cancelled {
            bail!(
                "Training cancelled after {} completed epoch(s)",
                training.epochs_completed
            );
        }

        let predicted = classifier
            .predict(test_inputs.view())
            .with_context(|| format!("{} failed to predict", classifier.name()))?;

        let evaluation = evaluate(
            predicted.view(),
            test_labels.view(),
            split.test.entities(),
            options.window.horizon_length(),
        )?;
        (training, evaluation)
    };

    evaluation.attach_anchor_dates(&split.test.anchor_dates())?;

    Ok(RunReport {
        classifier: classifier.name(),
        window: options.window,
        window_stats,
        train_len: split.train.len(),
        test_len: split.test.len(),
        positive_rates,
        training,
        evaluation,
    })
}
