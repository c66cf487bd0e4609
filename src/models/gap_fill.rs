use {
    crate::{
        domain::Field,
        models::pivot::{EntitySeries, PivotedSeries},
        utils::{fill_forward_mut, leading_none_count},
    },
    rayon::prelude::*,
    strum::IntoEnumIterator,
};

/// What the forward fill did to one (entity, field) column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGapSummary {
    pub entity: String,
    pub field: Field,
    pub filled: usize,
    /// Holes before the first observed value; these cannot be filled and any
    /// window touching them is skipped later.
    pub leading_holes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GapFillReport {
    pub columns: Vec<ColumnGapSummary>,
}

impl GapFillReport {
    pub fn total_filled(&self) -> usize {
        self.columns.iter().map(|c| c.filled).sum()
    }

    pub fn total_leading_holes(&self) -> usize {
        self.columns.iter().map(|c| c.leading_holes).sum()
    }
}

/// Forward-fill every (entity, field) column independently.
///
/// Returns a new grid; the input is untouched. Leading holes survive.
pub fn forward_fill(pivot: &PivotedSeries) -> (PivotedSeries, GapFillReport) {
    let entities = pivot.entities();

    // Collect keeps entity order, so the result is deterministic across runs.
    let filled: Vec<(EntitySeries, Vec<ColumnGapSummary>)> = pivot
        .series()
        .par_iter()
        .enumerate()
        .map(|(entity_index, source)| {
            let entity = entities.get(entity_index).unwrap_or_default().to_string();
            let mut series = source.clone();
            let summaries = Field::iter()
                .map(|field| {
                    let column = series.field_mut(field);
                    let filled = fill_forward_mut(column);
                    ColumnGapSummary {
                        entity: entity.clone(),
                        field,
                        filled,
                        leading_holes: leading_none_count(column),
                    }
                })
                .collect();
            (series, summaries)
        })
        .collect();

    let mut report = GapFillReport::default();
    let mut series = Vec::with_capacity(filled.len());
    for (entity_series, summaries) in filled {
        series.push(entity_series);
        report.columns.extend(summaries);
    }

    for column in report.columns.iter().filter(|c| c.leading_holes > 0) {
        log::debug!(
            "Gap fill: {} {} keeps {} leading hole(s)",
            column.entity,
            column.field,
            column.leading_holes
        );
    }
    log::info!(
        "Gap fill: {} hole(s) forward-filled, {} leading hole(s) left",
        report.total_filled(),
        report.total_leading_holes()
    );

    let filled_pivot =
        PivotedSeries::from_parts(pivot.axis().clone(), entities.clone(), series);
    (filled_pivot, report)
}
