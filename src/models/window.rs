use {
    crate::{
        config::{LOG_FLAGS, PIPELINE},
        domain::Field,
        error::{PipelineError, PipelineResult},
        models::pivot::PivotedSeries,
        utils::mean,
    },
    chrono::NaiveDate,
    ndarray::{Array2, Array3, ArrayView2, Axis},
    serde::{Deserialize, Serialize},
};

/// Lookback/horizon lengths for one windowing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    lookback_length: usize,
    horizon_length: usize,
}

impl WindowConfig {
    pub fn new(lookback_length: usize, horizon_length: usize) -> PipelineResult<Self> {
        if lookback_length == 0 || horizon_length == 0 {
            return Err(PipelineError::InvalidConfig {
                reason: format!(
                    "lookback ({}) and horizon ({}) must both be at least 1",
                    lookback_length, horizon_length
                ),
            });
        }
        if lookback_length
            .checked_add(horizon_length)
            .and_then(|span| span.checked_add(1))
            .is_none()
        {
            return Err(PipelineError::InvalidConfig {
                reason: format!(
                    "lookback ({}) + horizon ({}) overflows the axis index range",
                    lookback_length, horizon_length
                ),
            });
        }
        Ok(Self {
            lookback_length,
            horizon_length,
        })
    }

    pub fn lookback_length(&self) -> usize {
        self.lookback_length
    }

    pub fn horizon_length(&self) -> usize {
        self.horizon_length
    }

    /// Smallest axis length that admits at least one anchor.
    pub fn min_axis_len(&self) -> usize {
        self.lookback_length
            .saturating_add(self.horizon_length)
            .saturating_add(1)
    }

    /// Inclusive range of anchor positions for an axis of `axis_len`, if any.
    ///
    /// The first `lookback_length` positions lack a full lookback and the last
    /// `horizon_length` lack a full horizon, so neither can ever anchor.
    pub fn anchor_bounds(&self, axis_len: usize) -> Option<(usize, usize)> {
        let last = axis_len.checked_sub(1)?.checked_sub(self.horizon_length)?;
        (last >= self.lookback_length).then_some((self.lookback_length, last))
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback_length: PIPELINE.lookback_length,
            horizon_length: PIPELINE.horizon_length,
        }
    }
}

/// One supervised sample: a lookback tensor and its multi-entity,
/// multi-horizon up/down labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSample {
    pub anchor_index: usize,
    pub anchor_date: NaiveDate,
    /// [lookback_length, entity_count * 2], oldest row first.
    /// Columns: e0.open, e0.close, e1.open, e1.close, ...
    inputs: Array2<f64>,
    /// entity_count * horizon_length labels, entity-major.
    labels: Vec<u8>,
}

impl WindowSample {
    pub fn inputs(&self) -> ArrayView2<'_, f64> {
        self.inputs.view()
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }
}

/// Ordered samples from one windowing run. Order is anchor order and is never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    config: WindowConfig,
    entities: Vec<String>,
    samples: Vec<WindowSample>,
}

impl SampleSet {
    pub(crate) fn from_parts(
        config: WindowConfig,
        entities: Vec<String>,
        samples: Vec<WindowSample>,
    ) -> Self {
        Self {
            config,
            entities,
            samples,
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn samples(&self) -> &[WindowSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.entities.len() * Field::COUNT
    }

    pub fn label_width(&self) -> usize {
        self.entities.len() * self.config.horizon_length
    }

    pub fn anchor_dates(&self) -> Vec<NaiveDate> {
        self.samples.iter().map(|s| s.anchor_date).collect()
    }

    /// Stacked inputs, [sample_count, lookback_length, entity_count * 2].
    pub fn inputs_tensor(&self) -> Array3<f64> {
        let mut tensor = Array3::zeros((
            self.samples.len(),
            self.config.lookback_length,
            self.feature_count(),
        ));
        for (mut slot, sample) in tensor.axis_iter_mut(Axis(0)).zip(&self.samples) {
            slot.assign(&sample.inputs);
        }
        tensor
    }

    /// Stacked labels, [sample_count, entity_count * horizon_length].
    pub fn label_matrix(&self) -> Array2<u8> {
        let mut matrix = Array2::zeros((self.samples.len(), self.label_width()));
        for (mut row, sample) in matrix.axis_iter_mut(Axis(0)).zip(&self.samples) {
            for (cell, &label) in row.iter_mut().zip(&sample.labels) {
                *cell = label;
            }
        }
        matrix
    }

    /// Share of "up" labels per entity, over all samples and horizon days.
    pub fn positive_rates(&self) -> Vec<(String, f64)> {
        let horizon = self.config.horizon_length;
        self.entities
            .iter()
            .enumerate()
            .map(|(entity_index, entity)| {
                let block = entity_index * horizon..(entity_index + 1) * horizon;
                let values: Vec<f64> = self
                    .samples
                    .iter()
                    .flat_map(|s| s.labels[block.clone()].iter().map(|&l| f64::from(l)))
                    .collect();
                (entity.clone(), mean(&values))
            })
            .collect()
    }

    /// Split into two sets at `index`, both keeping order. Consumes `self`.
    pub(crate) fn split_at(mut self, index: usize) -> (Self, Self) {
        let tail = self.samples.split_off(index);
        let head = Self {
            config: self.config,
            entities: self.entities.clone(),
            samples: self.samples,
        };
        let tail = Self {
            config: self.config,
            entities: self.entities,
            samples: tail,
        };
        (head, tail)
    }

    /// Every sample must carry a [lookback, entities * 2] input block and
    /// entities * horizon labels. Sets built here always do; deserialized ones
    /// are checked with this before use.
    pub fn validate_shapes(&self) -> PipelineResult<()> {
        let expected_inputs = (self.config.lookback_length, self.feature_count());
        for sample in &self.samples {
            if sample.inputs.dim() != expected_inputs {
                return Err(PipelineError::ShapeMismatch {
                    what: "sample input block",
                    expected: vec![expected_inputs.0, expected_inputs.1],
                    actual: sample.inputs.shape().to_vec(),
                });
            }
            if sample.labels.len() != self.label_width() {
                return Err(PipelineError::ShapeMismatch {
                    what: "sample label vector",
                    expected: vec![self.label_width()],
                    actual: vec![sample.labels.len()],
                });
            }
        }
        Ok(())
    }

    /// Give up ownership of the samples, e.g. to drop large tensors early.
    pub fn into_samples(self) -> Vec<WindowSample> {
        self.samples
    }
}

/// Counters from one windowing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowStats {
    pub candidates: usize,
    pub emitted: usize,
    pub skipped_for_holes: usize,
}

/// Slide the lookback window over the normalized grid and emit one sample per
/// valid anchor, in increasing anchor order.
///
/// An anchor whose lookback, baseline or horizon touches a hole is skipped
/// silently. That is the missing-data policy, not an error. Fails with
/// `InsufficientData` when the axis is too short or no anchor survives.
pub fn build_samples(normalized: &PivotedSeries, config: &WindowConfig) -> PipelineResult<SampleSet> {
    build_samples_with_stats(normalized, config).map(|(samples, _)| samples)
}

/// Same as [`build_samples`], also returning how many anchors were skipped.
pub fn build_samples_with_stats(
    normalized: &PivotedSeries,
    config: &WindowConfig,
) -> PipelineResult<(SampleSet, WindowStats)> {
    let axis_len = normalized.axis().len();
    let Some((first_anchor, last_anchor)) = config.anchor_bounds(axis_len) else {
        return Err(PipelineError::InsufficientData {
            reason: format!(
                "date axis has {} position(s); lookback {} + horizon {} needs at least {}",
                axis_len,
                config.lookback_length,
                config.horizon_length,
                config.min_axis_len()
            ),
        });
    };

    let mut stats = WindowStats::default();
    let mut samples = Vec::with_capacity(last_anchor - first_anchor + 1);

    for anchor in first_anchor..=last_anchor {
        stats.candidates += 1;
        match build_sample(normalized, config, anchor) {
            Some(sample) => samples.push(sample),
            None => {
                stats.skipped_for_holes += 1;
                if LOG_FLAGS.log_windows {
                    log::debug!("Windows: anchor {} skipped (touches a hole)", anchor);
                }
            }
        }
    }
    stats.emitted = samples.len();

    log::info!(
        "Windows: {} candidate anchor(s), {} emitted, {} skipped for holes (lookback {}, horizon {})",
        stats.candidates,
        stats.emitted,
        stats.skipped_for_holes,
        config.lookback_length,
        config.horizon_length,
    );

    if samples.is_empty() {
        return Err(PipelineError::InsufficientData {
            reason: format!(
                "none of the {} candidate anchor(s) has a hole-free window",
                stats.candidates
            ),
        });
    }

    let set = SampleSet::from_parts(*config, normalized.entities().as_slice().to_vec(), samples);
    Ok((set, stats))
}

/// `None` if any participating value is a hole.
fn build_sample(normalized: &PivotedSeries, config: &WindowConfig, anchor: usize) -> Option<WindowSample> {
    let series = normalized.series();
    let lookback = config.lookback_length;
    let horizon = config.horizon_length;

    let mut inputs = Array2::zeros((lookback, series.len() * Field::COUNT));
    for (row, position) in (anchor - lookback..anchor).enumerate() {
        for (entity_index, entity) in series.iter().enumerate() {
            let base = entity_index * Field::COUNT;
            inputs[[row, base + Field::Open.offset()]] = entity.open[position]?;
            inputs[[row, base + Field::Close.offset()]] = entity.close[position]?;
        }
    }

    let mut labels = Vec::with_capacity(series.len() * horizon);
    for entity in series {
        let baseline = entity.close[anchor]?;
        for step in 1..=horizon {
            let future = entity.close[anchor + step]?;
            labels.push(u8::from(future > baseline));
        }
    }

    Some(WindowSample {
        anchor_index: anchor,
        anchor_date: normalized.axis().get(anchor)?,
        inputs,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Observation,
        models::{gap_fill::forward_fill, pivot::build_pivot, scale::{fit_scale_parameters, normalize_series}},
    };
    use chrono::Duration;

    fn normalized_grid(rows: &[Observation]) -> PivotedSeries {
        let (filled, _) = forward_fill(&build_pivot(rows).unwrap());
        let scale = fit_scale_parameters(&filled);
        normalize_series(&filled, &scale).unwrap()
    }

    fn day(offset: i64) -> String {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        crate::utils::format_date_key(start + Duration::days(offset))
    }

    /// One entity whose close equals its open equals `closes[i]`.
    fn single_entity(closes: &[f64]) -> Vec<Observation> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Observation::new(day(i as i64), "A", c, c))
            .collect()
    }

    #[test]
    fn zero_lengths_are_invalid_config() {
        assert!(matches!(WindowConfig::new(0, 3), Err(PipelineError::InvalidConfig { .. })));
        assert!(matches!(WindowConfig::new(12, 0), Err(PipelineError::InvalidConfig { .. })));
        assert_eq!(WindowConfig::default(), WindowConfig::new(12, 3).unwrap());
    }

    #[test]
    fn anchor_bounds_exclude_edges() {
        let config = WindowConfig::new(12, 3).unwrap();
        assert_eq!(config.anchor_bounds(15), None);
        assert_eq!(config.anchor_bounds(16), Some((12, 12)));
        assert_eq!(config.anchor_bounds(20), Some((12, 16)));
    }

    #[test]
    fn oversized_window_is_invalid_config() {
        assert!(matches!(
            WindowConfig::new(usize::MAX, 3),
            Err(PipelineError::InvalidConfig { .. })
        ));
        assert!(matches!(
            WindowConfig::new(3, usize::MAX - 3),
            Err(PipelineError::InvalidConfig { .. })
        ));
        assert!(WindowConfig::new(usize::MAX - 4, 3).is_ok());
    }

    #[test]
    fn huge_lengths_never_overflow_bounds() {
        // Bypasses `new`, as a deserialized config would.
        let config = WindowConfig {
            lookback_length: usize::MAX,
            horizon_length: usize::MAX,
        };
        assert_eq!(config.min_axis_len(), usize::MAX);
        assert_eq!(config.anchor_bounds(20), None);
        assert_eq!(config.anchor_bounds(usize::MAX), None);

        let grid = normalized_grid(&single_entity(&[1.0, 2.0, 3.0]));
        let config = WindowConfig::new(usize::MAX - 4, 3).unwrap();
        assert!(matches!(
            build_samples(&grid, &config),
            Err(PipelineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn boundary_anchors_included_and_neighbours_excluded() {
        let closes: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let grid = normalized_grid(&single_entity(&closes));
        let config = WindowConfig::new(12, 3).unwrap();
        let set = build_samples(&grid, &config).unwrap();

        let anchors: Vec<usize> = set.samples().iter().map(|s| s.anchor_index).collect();
        assert_eq!(anchors, (12..=16).collect::<Vec<_>>());
        assert!(!anchors.contains(&11));
        assert!(!anchors.contains(&17));
    }

    #[test]
    fn axis_not_longer_than_lookback_plus_horizon_is_insufficient() {
        let closes: Vec<f64> = (0..15).map(|i| i as f64).collect();
        let grid = normalized_grid(&single_entity(&closes));
        let config = WindowConfig::new(12, 3).unwrap();
        assert!(matches!(
            build_samples(&grid, &config),
            Err(PipelineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn labels_compare_future_close_against_anchor_close() {
        // Raw closes chosen so that normalized values are 0.2, 0.5, 0.1, 0.9
        // at positions 1..=4 with min 0 and max 10 pinned by positions 0 and 5.
        let closes = [0.0, 2.0, 5.0, 1.0, 9.0, 10.0];
        let grid = normalized_grid(&single_entity(&closes));
        let config = WindowConfig::new(2, 2).unwrap();
        let set = build_samples(&grid, &config).unwrap();

        let sample = set.samples().iter().find(|s| s.anchor_index == 2).unwrap();
        // baseline 0.5 -> next 0.1 (down), then 0.9 (up)
        assert_eq!(sample.labels(), &[0, 1]);
        assert_eq!(sample.anchor_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn equal_future_close_is_labeled_down() {
        let closes = [1.0, 3.0, 3.0, 4.0];
        let grid = normalized_grid(&single_entity(&closes));
        let set = build_samples(&grid, &WindowConfig::new(1, 2).unwrap()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.samples()[0].labels(), &[0, 1]);
    }

    #[test]
    fn inputs_interleave_open_close_in_entity_order_oldest_first() {
        let mut rows = Vec::new();
        for i in 0..4 {
            rows.push(Observation::new(day(i), "B", 100.0 + i as f64, 200.0 + i as f64));
            rows.push(Observation::new(day(i), "A", i as f64, 10.0 + i as f64));
        }
        let grid = normalized_grid(&rows);
        let set = build_samples(&grid, &WindowConfig::new(2, 1).unwrap()).unwrap();
        assert_eq!(set.entities(), &["A".to_string(), "B".to_string()]);

        let first = &set.samples()[0];
        assert_eq!(first.anchor_index, 2);
        let inputs = first.inputs();
        assert_eq!(inputs.dim(), (2, 4));
        // Every column spans 3 units over 4 days, so position p normalizes to p / 3.
        let expect = |p: f64| p / 3.0;
        assert_eq!(inputs.row(0).to_vec(), vec![expect(0.0); 4]);
        assert_eq!(inputs.row(1).to_vec(), vec![expect(1.0); 4]);
        assert_eq!(first.labels(), &[1, 1]);
    }

    #[test]
    fn windows_touching_leading_holes_are_skipped() {
        let mut rows = single_entity(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        // B only appears from day 2 on, so anchors whose lookback reaches days 0-1 are dropped.
        for i in 2..6 {
            rows.push(Observation::new(day(i), "B", i as f64, i as f64));
        }
        let grid = normalized_grid(&rows);
        let set = build_samples(&grid, &WindowConfig::new(2, 1).unwrap()).unwrap();
        let anchors: Vec<usize> = set.samples().iter().map(|s| s.anchor_index).collect();
        assert_eq!(anchors, vec![4]);
    }

    #[test]
    fn stats_count_skipped_anchors() {
        let mut rows = single_entity(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        for i in 2..6 {
            rows.push(Observation::new(day(i), "B", i as f64, i as f64));
        }
        let grid = normalized_grid(&rows);
        let (set, stats) = build_samples_with_stats(&grid, &WindowConfig::new(2, 1).unwrap()).unwrap();
        assert_eq!(
            stats,
            WindowStats {
                candidates: 3,
                emitted: 1,
                skipped_for_holes: 2,
            }
        );
        assert_eq!(set.len(), stats.emitted);
    }

    #[test]
    fn all_anchors_touching_holes_is_insufficient() {
        let mut rows = single_entity(&[1.0, 2.0, 3.0, 4.0]);
        rows.push(Observation::new(day(3), "LATE", 1.0, 1.0));
        let grid = normalized_grid(&rows);
        assert!(matches!(
            build_samples(&grid, &WindowConfig::new(1, 1).unwrap()),
            Err(PipelineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn stacked_tensors_match_per_sample_data() {
        let closes: Vec<f64> = (0..10).map(|i| (i % 3) as f64).collect();
        let grid = normalized_grid(&single_entity(&closes));
        let set = build_samples(&grid, &WindowConfig::new(3, 2).unwrap()).unwrap();

        let tensor = set.inputs_tensor();
        assert_eq!(tensor.dim(), (set.len(), 3, 2));
        let labels = set.label_matrix();
        assert_eq!(labels.dim(), (set.len(), 2));
        for (i, sample) in set.samples().iter().enumerate() {
            assert_eq!(tensor.index_axis(Axis(0), i), sample.inputs());
            assert_eq!(labels.row(i).to_vec(), sample.labels().to_vec());
        }
    }

    #[test]
    fn shape_check_catches_entity_count_drift() {
        let closes: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let grid = normalized_grid(&single_entity(&closes));
        let config = WindowConfig::new(2, 2).unwrap();
        let set = build_samples(&grid, &config).unwrap();
        assert_eq!(set.validate_shapes(), Ok(()));

        let count = set.len();
        let samples = set.into_samples();
        assert_eq!(samples.len(), count);

        // Same samples claimed for two entities: blocks are half as wide as required
        let widened = SampleSet::from_parts(config, vec!["A".into(), "B".into()], samples);
        assert!(matches!(
            widened.validate_shapes(),
            Err(PipelineError::ShapeMismatch { what: "sample input block", .. })
        ));
    }

    #[test]
    fn rebuilding_with_other_parameters_leaves_grid_untouched() {
        let closes: Vec<f64> = (0..12).map(|i| (i * 7 % 5) as f64).collect();
        let grid = normalized_grid(&single_entity(&closes));
        let before = grid.clone();
        let a = build_samples(&grid, &WindowConfig::new(3, 2).unwrap()).unwrap();
        let b = build_samples(&grid, &WindowConfig::new(5, 1).unwrap()).unwrap();
        assert_eq!(grid, before);
        assert_ne!(a.len(), 0);
        assert_ne!(b.len(), 0);
        assert_eq!(build_samples(&grid, &WindowConfig::new(3, 2).unwrap()).unwrap(), a);
    }
}
