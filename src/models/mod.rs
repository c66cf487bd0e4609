mod evaluation;
mod gap_fill;
mod pivot;
mod scale;
mod split;
mod window;

pub use {
    evaluation::{
        EntityDiagnostics, EvaluationReport, PredictionRecord, SampleOutcome, classify, evaluate,
        evaluate_with_threshold,
    },
    gap_fill::{ColumnGapSummary, GapFillReport, forward_fill},
    pivot::{DateAxis, EntitySeries, EntitySet, PivotedSeries, build_pivot},
    scale::{FieldScales, MinMax, ScaleParameters, fit_scale_parameters, normalize_series},
    split::{ChronologicalSplit, split_chronological},
    window::{
        SampleSet, WindowConfig, WindowSample, WindowStats, build_samples, build_samples_with_stats,
    },
};
