use crate::{
    error::{PipelineError, PipelineResult},
    models::window::SampleSet,
};

/// Train/test partition that preserves anchor order. Never shuffled.
#[derive(Debug, Clone, PartialEq)]
pub struct ChronologicalSplit {
    pub train: SampleSet,
    pub test: SampleSet,
}

impl ChronologicalSplit {
    pub fn len(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `train = samples[..floor(fraction * n)]`, `test = the rest`.
///
/// Fails with `InsufficientData` rather than hand back an empty side.
pub fn split_chronological(samples: SampleSet, train_fraction: f64) -> PipelineResult<ChronologicalSplit> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(PipelineError::InvalidConfig {
            reason: format!("train fraction {} must lie strictly between 0 and 1", train_fraction),
        });
    }

    let n = samples.len();
    let split = (n as f64 * train_fraction).floor() as usize;
    if n < 2 || split == 0 || split == n {
        return Err(PipelineError::InsufficientData {
            reason: format!(
                "{} sample(s) cannot be split {:.0}/{:.0} without an empty side (split index {})",
                n,
                train_fraction * 100.0,
                (1.0 - train_fraction) * 100.0,
                split
            ),
        });
    }

    let (train, test) = samples.split_at(split);

    log::info!(
        "Split: {} train ({:?} .. {:?}) / {} test ({:?} .. {:?})",
        train.len(),
        train.samples().first().map(|s| s.anchor_date),
        train.samples().last().map(|s| s.anchor_date),
        test.len(),
        test.samples().first().map(|s| s.anchor_date),
        test.samples().last().map(|s| s.anchor_date),
    );

    Ok(ChronologicalSplit { train, test })
}
