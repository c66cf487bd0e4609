//! Decomposes a flat [samples, entities x horizon] prediction matrix back into
//! per-entity accuracy and per-sample correctness timelines.

use {
    crate::{
        config::{LOG_FLAGS, PIPELINE},
        error::{PipelineError, PipelineResult},
    },
    chrono::NaiveDate,
    itertools::izip,
    ndarray::{ArrayView2, Axis},
    serde::Serialize,
    std::collections::BTreeMap,
};

/// Probability strictly above `threshold` is class 1; a tie classifies as 0.
#[inline]
pub fn classify(probability: f64, threshold: f64) -> u8 {
    u8::from(probability > threshold)
}

/// One scored (entity, horizon day) cell of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PredictionRecord {
    /// Position in the canonical entity order.
    pub entity_index: usize,
    /// 0-based: day 0 is the first position after the anchor.
    pub horizon_day: usize,
    pub predicted: u8,
    pub actual: u8,
    pub correct: bool,
}

/// All horizon-day records of one entity for one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleOutcome {
    pub sample_index: usize,
    pub anchor_date: Option<NaiveDate>,
    pub records: Vec<PredictionRecord>,
}

impl SampleOutcome {
    pub fn correct_count(&self) -> usize {
        self.records.iter().filter(|r| r.correct).count()
    }

    pub fn all_correct(&self) -> bool {
        self.records.iter().all(|r| r.correct)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDiagnostics {
    pub entity: String,
    pub correct: usize,
    pub total: usize,
    day_correct: Vec<usize>,
    timeline: Vec<SampleOutcome>,
}

impl EntityDiagnostics {
    fn new(entity: String, horizon_length: usize, sample_count: usize) -> Self {
        Self {
            entity,
            correct: 0,
            total: 0,
            day_correct: vec![0; horizon_length],
            timeline: Vec::with_capacity(sample_count),
        }
    }

    /// correct / total over every sample and horizon day of this entity.
    pub fn accuracy(&self) -> f64 {
        self.correct as f64 / self.total as f64
    }

    pub fn day_accuracy(&self, day: usize) -> Option<f64> {
        let samples = self.timeline.len();
        self.day_correct
            .get(day)
            .map(|&correct| correct as f64 / samples as f64)
    }

    pub fn timeline(&self) -> &[SampleOutcome] {
        &self.timeline
    }
}

/// Result of one evaluation pass. Read-only for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    horizon_length: usize,
    sample_count: usize,
    entities: Vec<EntityDiagnostics>,
}

impl EvaluationReport {
    pub fn horizon_length(&self) -> usize {
        self.horizon_length
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// In canonical entity order.
    pub fn entities(&self) -> &[EntityDiagnostics] {
        &self.entities
    }

    pub fn entity(&self, entity: &str) -> Option<&EntityDiagnostics> {
        self.entities.iter().find(|d| d.entity == entity)
    }

    pub fn accuracy(&self, entity: &str) -> Option<f64> {
        self.entity(entity).map(EntityDiagnostics::accuracy)
    }

    pub fn accuracy_map(&self) -> BTreeMap<String, f64> {
        self.entities
            .iter()
            .map(|d| (d.entity.clone(), d.accuracy()))
            .collect()
    }

    pub fn day_accuracy(&self, entity: &str, day: usize) -> Option<f64> {
        self.entity(entity).and_then(|d| d.day_accuracy(day))
    }

    pub fn overall_accuracy(&self) -> f64 {
        let (correct, total) = self
            .entities
            .iter()
            .fold((0, 0), |(c, t), d| (c + d.correct, t + d.total));
        correct as f64 / total as f64
    }

    pub fn timeline(&self, entity: &str) -> Option<&[SampleOutcome]> {
        self.entity(entity).map(EntityDiagnostics::timeline)
    }

    pub fn record(&self, entity: &str, sample: usize, day: usize) -> Option<&PredictionRecord> {
        self.entity(entity)
            .and_then(|d| d.timeline.get(sample))
            .and_then(|outcome| outcome.records.get(day))
    }

    /// Tag every timeline entry with its anchor date. One date per sample.
    pub fn attach_anchor_dates(&mut self, anchor_dates: &[NaiveDate]) -> PipelineResult<()> {
        if anchor_dates.len() != self.sample_count {
            return Err(PipelineError::ShapeMismatch {
                what: "anchor dates",
                expected: vec![self.sample_count],
                actual: vec![anchor_dates.len()],
            });
        }
        for diagnostics in &mut self.entities {
            for outcome in &mut diagnostics.timeline {
                outcome.anchor_date = Some(anchor_dates[outcome.sample_index]);
            }
        }
        Ok(())
    }
}

/// Score `predicted` probabilities against `actual` labels with the default threshold.
///
/// Column `entity_index * horizon_length + day` belongs to that entity and day.
pub fn evaluate(
    predicted: ArrayView2<'_, f64>,
    actual: ArrayView2<'_, u8>,
    entities: &[String],
    horizon_length: usize,
) -> PipelineResult<EvaluationReport> {
    evaluate_with_threshold(
        predicted,
        actual,
        entities,
        horizon_length,
        PIPELINE.decision_threshold,
    )
}

pub fn evaluate_with_threshold(
    predicted: ArrayView2<'_, f64>,
    actual: ArrayView2<'_, u8>,
    entities: &[String],
    horizon_length: usize,
    threshold: f64,
) -> PipelineResult<EvaluationReport> {
    if horizon_length == 0 {
        return Err(PipelineError::InvalidConfig {
            reason: "horizon length must be at least 1".to_string(),
        });
    }
    if predicted.dim() != actual.dim() {
        return Err(PipelineError::ShapeMismatch {
            what: "prediction vs label matrix",
            expected: actual.shape().to_vec(),
            actual: predicted.shape().to_vec(),
        });
    }
    let width = entities.len() * horizon_length;
    if predicted.ncols() != width {
        return Err(PipelineError::ShapeMismatch {
            what: "prediction matrix columns (entities x horizon)",
            expected: vec![predicted.nrows(), width],
            actual: predicted.shape().to_vec(),
        });
    }
    let sample_count = predicted.nrows();
    if sample_count == 0 {
        return Err(PipelineError::EmptyInput {
            what: "evaluation needs at least one sample",
        });
    }

    let mut diagnostics: Vec<EntityDiagnostics> = entities
        .iter()
        .map(|e| EntityDiagnostics::new(e.clone(), horizon_length, sample_count))
        .collect();

    for (sample_index, (pred_row, actual_row)) in predicted
        .axis_iter(Axis(0))
        .zip(actual.axis_iter(Axis(0)))
        .enumerate()
    {
        for (entity_index, entity) in diagnostics.iter_mut().enumerate() {
            let start = entity_index * horizon_length;
            let mut records = Vec::with_capacity(horizon_length);

            for (day, &probability, &label) in izip!(
                0..horizon_length,
                pred_row.iter().skip(start),
                actual_row.iter().skip(start)
            ) {
                if label > 1 {
                    return Err(PipelineError::InvalidLabel {
                        sample: sample_index,
                        column: start + day,
                        value: label,
                    });
                }
                if !(0.0..=1.0).contains(&probability) {
                    return Err(PipelineError::InvalidPrediction {
                        sample: sample_index,
                        column: start + day,
                        value: probability,
                    });
                }
                let predicted_class = classify(probability, threshold);
                let correct = predicted_class == label;
                if correct {
                    entity.correct += 1;
                    entity.day_correct[day] += 1;
                }
                entity.total += 1;
                records.push(PredictionRecord {
                    entity_index,
                    horizon_day: day,
                    predicted: predicted_class,
                    actual: label,
                    correct,
                });
            }

            entity.timeline.push(SampleOutcome {
                sample_index,
                anchor_date: None,
                records,
            });
        }
    }

    let report = EvaluationReport {
        horizon_length,
        sample_count,
        entities: diagnostics,
    };

    if LOG_FLAGS.log_evaluation {
        log::info!(
            "Evaluation: {} sample(s) x {} entit(ies) x {} day(s), overall accuracy {:.2}%",
            sample_count,
            entities.len(),
            horizon_length,
            report.overall_accuracy() * 100.0
        );
    }

    Ok(report)
}
