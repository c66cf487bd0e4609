use {
    crate::{
        config::LOG_FLAGS,
        domain::{Field, Observation},
        error::{PipelineError, PipelineResult},
        utils::count_none_elements,
    },
    chrono::NaiveDate,
    serde::{Deserialize, Serialize},
    std::collections::BTreeSet,
};

/// Strictly increasing, deduplicated calendar days. Position in this axis is
/// the time index every downstream structure uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateAxis {
    dates: Vec<NaiveDate>,
}

impl DateAxis {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<NaiveDate> {
        self.dates.get(position).copied()
    }

    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    pub fn as_slice(&self) -> &[NaiveDate] {
        &self.dates
    }
}

/// Sorted, deduplicated entity ids. The order is the column order of every
/// tensor and label vector and never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    ids: Vec<String>,
}

impl EntitySet {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    pub fn index_of(&self, entity: &str) -> Option<usize> {
        self.ids
            .binary_search_by(|name| name.as_str().cmp(entity))
            .ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }
}

/// One entity's columns, aligned by axis position. `None` marks a hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySeries {
    pub open: Vec<Option<f64>>,
    pub close: Vec<Option<f64>>,
}

impl EntitySeries {
    pub(crate) fn with_holes(len: usize) -> Self {
        Self {
            open: vec![None; len],
            close: vec![None; len],
        }
    }

    pub fn field(&self, field: Field) -> &[Option<f64>] {
        match field {
            Field::Open => &self.open,
            Field::Close => &self.close,
        }
    }

    pub(crate) fn field_mut(&mut self, field: Field) -> &mut Vec<Option<f64>> {
        match field {
            Field::Open => &mut self.open,
            Field::Close => &mut self.close,
        }
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

/// Dense entity -> field -> value grid over the date axis.
///
/// Invariant: every column has exactly `axis.len()` slots and `series` is
/// indexed by entity position in `entities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotedSeries {
    axis: DateAxis,
    entities: EntitySet,
    series: Vec<EntitySeries>,
}

impl PivotedSeries {
    /// Used by the later stages to rebuild a grid over the same axis/entities.
    pub(crate) fn from_parts(axis: DateAxis, entities: EntitySet, series: Vec<EntitySeries>) -> Self {
        debug_assert_eq!(entities.len(), series.len());
        debug_assert!(series.iter().all(|s| s.len() == axis.len() && s.close.len() == axis.len()));
        Self {
            axis,
            entities,
            series,
        }
    }

    pub fn axis(&self) -> &DateAxis {
        &self.axis
    }

    pub fn entities(&self) -> &EntitySet {
        &self.entities
    }

    pub fn series(&self) -> &[EntitySeries] {
        &self.series
    }

    pub fn series_for(&self, entity: &str) -> Option<&EntitySeries> {
        self.entities
            .index_of(entity)
            .map(|index| &self.series[index])
    }

    /// Value at (entity, field, axis position); `None` for a hole or out-of-range lookup.
    pub fn value(&self, entity_index: usize, field: Field, position: usize) -> Option<f64> {
        self.series
            .get(entity_index)
            .and_then(|s| s.field(field).get(position).copied().flatten())
    }

    pub fn hole_count(&self) -> usize {
        self.series
            .iter()
            .map(|s| count_none_elements(&s.open) + count_none_elements(&s.close))
            .sum()
    }
}

/// Pivot long-form observations into a dense grid.
///
/// Every row is validated before anything is built, so a malformed row fails
/// the whole call. Duplicate (date, entity) pairs overwrite: the last one in
/// traversal order wins.
pub fn build_pivot(observations: &[Observation]) -> PipelineResult<PivotedSeries> {
    let valid = observations
        .iter()
        .enumerate()
        .map(|(i, obs)| obs.validate(i + 1))
        .collect::<PipelineResult<Vec<_>>>()?;

    if valid.is_empty() {
        return Err(PipelineError::InsufficientData {
            reason: "no observations to pivot".to_string(),
        });
    }

    let axis = DateAxis {
        dates: valid
            .iter()
            .map(|v| v.date)
            .collect::<BTreeSet<_>>() // Sorts and deduplicates
            .into_iter()
            .collect(),
    };
    let entities = EntitySet {
        ids: valid
            .iter()
            .map(|v| v.entity)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect(),
    };

    let axis_len = axis.len();
    let mut series = vec![EntitySeries::with_holes(axis_len); entities.len()];
    let mut seen = vec![false; axis_len * entities.len()];
    let mut duplicates_overwritten = 0usize;

    for obs in &valid {
        // Both lookups are into sets built from these very rows.
        let (Some(position), Some(entity_index)) =
            (axis.position(obs.date), entities.index_of(obs.entity))
        else {
            continue;
        };

        let slot = entity_index * axis_len + position;
        if seen[slot] {
            duplicates_overwritten += 1;
        }
        seen[slot] = true;

        let target = &mut series[entity_index];
        target.open[position] = Some(obs.open);
        target.close[position] = Some(obs.close);
    }

    let pivot = PivotedSeries::from_parts(axis, entities, series);

    if LOG_FLAGS.log_pivot {
        log::info!(
            "Pivot: {} rows -> {} dates x {} entities ({} duplicates overwritten, {} holes)",
            valid.len(),
            pivot.axis.len(),
            pivot.entities.len(),
            duplicates_overwritten,
            pivot.hole_count(),
        );
    }

    Ok(pivot)
}
