use {
    crate::{
        domain::Field,
        error::{PipelineError, PipelineResult},
        models::pivot::{EntitySeries, PivotedSeries},
        utils::{min_max_present, normalize_min_max},
    },
    rayon::prelude::*,
    serde::{Deserialize, Serialize},
};

/// Scale bounds of one (entity, field) column over its full history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    /// Maps into [0, 1]; a constant column (min == max) maps to 0.
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        normalize_min_max(value, self.min, self.max)
    }
}

/// Open/close bounds for one entity. `None` when the column has no values at all.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldScales {
    pub open: Option<MinMax>,
    pub close: Option<MinMax>,
}

impl FieldScales {
    pub fn get(&self, field: Field) -> Option<MinMax> {
        match field {
            Field::Open => self.open,
            Field::Close => self.close,
        }
    }
}

/// Per-entity, per-field scale bounds, fit once and read-only afterwards.
///
/// Fitting runs over the entire history, test period included, so min/max of
/// the test period leak into the training inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleParameters {
    entities: Vec<String>,
    scales: Vec<FieldScales>,
}

impl ScaleParameters {
    /// Entities must already be in canonical (sorted, unique) order.
    pub(crate) fn from_parts(entities: Vec<String>, scales: Vec<FieldScales>) -> Self {
        debug_assert_eq!(entities.len(), scales.len());
        Self { entities, scales }
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, entity: &str) -> Option<&FieldScales> {
        self.entities
            .binary_search_by(|name| name.as_str().cmp(entity))
            .ok()
            .map(|index| &self.scales[index])
    }

    pub fn by_index(&self, entity_index: usize) -> Option<&FieldScales> {
        self.scales.get(entity_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldScales)> {
        self.entities
            .iter()
            .map(String::as_str)
            .zip(self.scales.iter())
    }
}

/// Fit min/max over every non-hole value of every column.
pub fn fit_scale_parameters(filled: &PivotedSeries) -> ScaleParameters {
    let scales = filled
        .series()
        .par_iter()
        .map(|series| {
            let bounds = |field: Field| {
                min_max_present(series.field(field)).map(|(min, max)| MinMax { min, max })
            };
            FieldScales {
                open: bounds(Field::Open),
                close: bounds(Field::Close),
            }
        })
        .collect();

    ScaleParameters::from_parts(filled.entities().as_slice().to_vec(), scales)
}

/// Apply fitted bounds elementwise. Holes stay holes.
///
/// Fails with `ShapeMismatch` if the parameters were fit for a different entity set.
pub fn normalize_series(
    filled: &PivotedSeries,
    scale: &ScaleParameters,
) -> PipelineResult<PivotedSeries> {
    if scale.entities() != filled.entities().as_slice() {
        return Err(PipelineError::ShapeMismatch {
            what: "scale parameter entities",
            expected: vec![filled.entities().len()],
            actual: vec![scale.len()],
        });
    }

    let normalized = filled
        .series()
        .par_iter()
        .zip(scale.scales.par_iter())
        .map(|(series, scales)| {
            let apply = |field: Field| -> Vec<Option<f64>> {
                let bounds = scales.get(field);
                series
                    .field(field)
                    .iter()
                    .map(|slot| match (slot, bounds) {
                        (Some(v), Some(b)) => Some(b.normalize(*v)),
                        _ => None,
                    })
                    .collect()
            };
            EntitySeries {
                open: apply(Field::Open),
                close: apply(Field::Close),
            }
        })
        .collect();

    Ok(PivotedSeries::from_parts(
        filled.axis().clone(),
        filled.entities().clone(),
        normalized,
    ))
}
