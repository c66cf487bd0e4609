use {
    crate::{
        config::{PIPELINE, TRAINING},
        error::{PipelineError, PipelineResult},
        models::classify,
    },
    anyhow::{Result, bail, ensure},
    ndarray::{Array1, Array2, ArrayView2, ArrayView3, Axis},
    serde::Serialize,
    std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Cooperative cancellation shared between a caller and a running fit.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    pub epoch_count: usize,
    pub batch_size: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epoch_count: TRAINING.epoch_count,
            batch_size: TRAINING.batch_size,
        }
    }
}

/// Borrowed inputs [N, lookback, features] and labels [N, entities * horizon].
#[derive(Debug, Clone, Copy)]
pub struct TrainingData<'a> {
    inputs: ArrayView3<'a, f64>,
    labels: ArrayView2<'a, u8>,
}

impl<'a> TrainingData<'a> {
    pub fn new(inputs: ArrayView3<'a, f64>, labels: ArrayView2<'a, u8>) -> PipelineResult<Self> {
        if inputs.len_of(Axis(0)) != labels.nrows() {
            return Err(PipelineError::ShapeMismatch {
                what: "training inputs vs labels (sample count)",
                expected: vec![inputs.len_of(Axis(0))],
                actual: vec![labels.nrows()],
            });
        }
        Ok(Self { inputs, labels })
    }

    pub fn inputs(&self) -> ArrayView3<'a, f64> {
        self.inputs
    }

    pub fn labels(&self) -> ArrayView2<'a, u8> {
        self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochMetrics {
    /// 1-based.
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TrainingSummary {
    pub epochs_completed: usize,
    pub cancelled: bool,
    pub history: Vec<EpochMetrics>,
}

/// Anything that maps a lookback tensor to per-(entity, day) "up" probabilities.
///
/// `predict` returns one row per input sample and one column per label column,
/// each value in [0, 1].
pub trait SequenceClassifier: Send {
    fn name(&self) -> &'static str;

    fn fit(
        &mut self,
        train: TrainingData<'_>,
        validation: Option<TrainingData<'_>>,
        options: &FitOptions,
        on_epoch_end: &mut dyn FnMut(&EpochMetrics),
        cancel: &CancelToken,
    ) -> Result<TrainingSummary>;

    fn predict(&self, inputs: ArrayView3<'_, f64>) -> Result<Array2<f64>>;
}

const PROBABILITY_EPSILON: f64 = 1e-7;

fn binary_cross_entropy(probability: f64, label: u8) -> f64 {
    let p = probability.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
    if label == 1 { -p.ln() } else { -(1.0 - p).ln() }
}

/// Mean loss and accuracy of a constant per-column prediction against `labels`.
fn score_rates(rates: &Array1<f64>, labels: ArrayView2<'_, u8>) -> (f64, f64) {
    let cells = labels.len();
    if cells == 0 {
        return (0.0, 0.0);
    }
    let mut loss = 0.0;
    let mut correct = 0usize;
    for row in labels.axis_iter(Axis(0)) {
        for (&y, &p) in row.iter().zip(rates.iter()) {
            loss += binary_cross_entropy(p, y);
            correct += usize::from(classify(p, PIPELINE.decision_threshold) == y);
        }
    }
    (loss / cells as f64, correct as f64 / cells as f64)
}

/// Predicts, for every sample, the Laplace-smoothed share of "up" labels seen
/// in training for that (entity, day) column. Ignores the inputs entirely.
#[derive(Debug, Clone, Default)]
pub struct ColumnFrequencyBaseline {
    rates: Option<Array1<f64>>,
    feature_count: usize,
}

impl ColumnFrequencyBaseline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rates(&self) -> Option<&Array1<f64>> {
        self.rates.as_ref()
    }
}

impl SequenceClassifier for ColumnFrequencyBaseline {
    fn name(&self) -> &'static str {
        "Column Frequency Baseline"
    }

    fn fit(
        &mut self,
        train: TrainingData<'_>,
        validation: Option<TrainingData<'_>>,
        options: &FitOptions,
        on_epoch_end: &mut dyn FnMut(&EpochMetrics),
        cancel: &CancelToken,
    ) -> Result<TrainingSummary> {
        ensure!(!train.is_empty(), "cannot fit on zero training samples");
        ensure!(
            options.epoch_count > 0 && options.batch_size > 0,
            "epoch count ({}) and batch size ({}) must be positive",
            options.epoch_count,
            options.batch_size
        );
        if let Some(val) = &validation {
            ensure!(
                val.labels().ncols() == train.labels().ncols(),
                "validation has {} label columns, training has {}",
                val.labels().ncols(),
                train.labels().ncols()
            );
        }

        let width = train.labels().ncols();
        let mut summary = TrainingSummary::default();

        for epoch in 1..=options.epoch_count {
            let mut positives = Array1::<f64>::zeros(width);
            let mut seen = 0usize;

            for batch in train.labels().axis_chunks_iter(Axis(0), options.batch_size) {
                if cancel.is_cancelled() {
                    log::warn!(
                        "{}: cancelled during epoch {} after {} sample(s)",
                        self.name(),
                        epoch,
                        seen
                    );
                    summary.cancelled = true;
                    return Ok(summary);
                }
                positives += &batch.mapv(f64::from).sum_axis(Axis(0));
                seen += batch.nrows();
            }

            let rates = positives.mapv(|p| (p + 1.0) / (seen as f64 + 2.0));
            let (loss, accuracy) = score_rates(&rates, train.labels());
            let (val_loss, val_accuracy) = match &validation {
                Some(val) if !val.is_empty() => {
                    let (l, a) = score_rates(&rates, val.labels());
                    (Some(l), Some(a))
                }
                _ => (None, None),
            };

            self.rates = Some(rates);
            self.feature_count = train.inputs().len_of(Axis(2));

            let metrics = EpochMetrics {
                epoch,
                loss,
                accuracy,
                val_loss,
                val_accuracy,
            };
            on_epoch_end(&metrics);
            summary.history.push(metrics);
            summary.epochs_completed = epoch;
        }

        Ok(summary)
    }

    fn predict(&self, inputs: ArrayView3<'_, f64>) -> Result<Array2<f64>> {
        let Some(rates) = &self.rates else {
            bail!("{} has not been fitted", self.name());
        };
        if inputs.len_of(Axis(2)) != self.feature_count {
            bail!(
                "input feature width {} does not match fitted width {}",
                inputs.len_of(Axis(2)),
                self.feature_count
            );
        }

        let rows = inputs.len_of(Axis(0));
        let mut out = Array2::zeros((rows, rates.len()));
        for mut row in out.axis_iter_mut(Axis(0)) {
            row.assign(rates);
        }
        Ok(out)
    }
}
