use crate::{
    domain::Observation,
    error::PipelineResult,
    models::{
        GapFillReport, PivotedSeries, SampleSet, ScaleParameters, WindowConfig, build_pivot,
        build_samples, fit_scale_parameters, forward_fill, normalize_series,
    },
    trace_time,
};

/// Pivoted, gap-filled and normalized grid, ready to be windowed any number of times.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    filled: PivotedSeries,
    normalized: PivotedSeries,
    scale: ScaleParameters,
    gap_report: GapFillReport,
}

impl PreparedDataset {
    /// Pivot, forward-fill, fit scale over the full history, normalize.
    pub fn prepare(observations: &[Observation]) -> PipelineResult<Self> {
        let (filled, gap_report) = Self::pivot_and_fill(observations)?;
        let scale = trace_time!("Fit scale", 1_000, { fit_scale_parameters(&filled) });
        Self::finish(filled, gap_report, scale)
    }

    /// Same as `prepare` but reuses previously fitted (e.g. restored) scale parameters.
    pub fn with_scale(observations: &[Observation], scale: ScaleParameters) -> PipelineResult<Self> {
        let (filled, gap_report) = Self::pivot_and_fill(observations)?;
        Self::finish(filled, gap_report, scale)
    }

    fn pivot_and_fill(observations: &[Observation]) -> PipelineResult<(PivotedSeries, GapFillReport)> {
        let pivot = trace_time!("Pivot", 1_000, { build_pivot(observations) })?;
        let (filled, gap_report) = trace_time!("Forward fill", 1_000, { forward_fill(&pivot) });
        Ok((filled, gap_report))
    }

    fn finish(
        filled: PivotedSeries,
        gap_report: GapFillReport,
        scale: ScaleParameters,
    ) -> PipelineResult<Self> {
        let normalized = trace_time!("Normalize", 1_000, { normalize_series(&filled, &scale) })?;
        Ok(Self {
            filled,
            normalized,
            scale,
            gap_report,
        })
    }

    /// Gap-filled values in original units, before normalization.
    pub fn filled(&self) -> &PivotedSeries {
        &self.filled
    }

    pub fn normalized(&self) -> &PivotedSeries {
        &self.normalized
    }

    pub fn scale(&self) -> &ScaleParameters {
        &self.scale
    }

    pub fn gap_report(&self) -> &GapFillReport {
        &self.gap_report
    }

    pub fn entities(&self) -> &[String] {
        self.normalized.entities().as_slice()
    }

    pub fn build_samples(&self, config: &WindowConfig) -> PipelineResult<SampleSet> {
        trace_time!("Build samples", 5_000, { build_samples(&self.normalized, config) })
    }
}
