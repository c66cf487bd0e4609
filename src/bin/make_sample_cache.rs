use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use trend_windows::WindowConfig;
use trend_windows::data::{CsvSource, ObservationSource, SampleCache, save_scale_record};
use trend_windows::engine::PreparedDataset;

// Builds the scale record and a sample cache for each listed window, so
// repeated experiments skip the pivot/normalize/window passes.
const WINDOWS: &[(usize, usize)] = &[(12, 3), (20, 5), (5, 1)];

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Setup Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Input path from the first argument
    let Some(input) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: make_sample_cache <observations.csv>");
    };

    log::info!("Building sample caches from {}", input.display());

    // 3. Load and prepare once
    let observations = CsvSource::new(&input)
        .load_observations()
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let dataset = PreparedDataset::prepare(&observations)?;
    log::info!(
        "Prepared {} entities over {} dates",
        dataset.entities().len(),
        dataset.normalized().axis().len()
    );

    save_scale_record(&trend_windows::data::default_scale_record_path(), dataset.scale())?;

    // 4. One cache per window; a window the history cannot support is skipped
    let mut written = 0;
    for &(lookback, horizon) in WINDOWS {
        let window = WindowConfig::new(lookback, horizon)?;
        let samples = match dataset.build_samples(&window) {
            Ok(samples) => samples,
            Err(e) => {
                log::warn!("Skipping lookback {} / horizon {}: {}", lookback, horizon, e);
                continue;
            }
        };
        SampleCache::new(samples).save_to_path(&SampleCache::default_path(&window))?;
        written += 1;
    }

    if written == 0 {
        log::error!("No window could be built from this history! Nothing written.");
        return Ok(());
    }

    log::info!("Success! {} cache file(s) written.", written);
    Ok(())
}
