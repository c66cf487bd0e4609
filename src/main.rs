use {
    anyhow::{Context, Result},
    clap::Parser,
    std::panic,
    tabled::{Table, Tabled},
    trend_windows::{
        CancelToken, Cli, ColumnFrequencyBaseline, EvaluationReport, PreparedDataset, RunReport,
        data::{
            CsvSource, ObservationSource, SampleCache, default_scale_record_path, save_scale_record,
        },
        run_pipeline,
    },
};

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "Per Day")]
    per_day: String,
    #[tabled(rename = "Up Rate")]
    up_rate: String,
}

#[derive(Tabled)]
struct TimelineRow {
    #[tabled(rename = "Anchor")]
    anchor: String,
    #[tabled(rename = "Predicted")]
    predicted: String,
    #[tabled(rename = "Actual")]
    actual: String,
    #[tabled(rename = "Hits")]
    hits: String,
}

fn accuracy_rows(report: &RunReport) -> Vec<EntityRow> {
    let evaluation = &report.evaluation;
    evaluation
        .entities()
        .iter()
        .map(|d| {
            let per_day = (0..evaluation.horizon_length())
                .filter_map(|day| d.day_accuracy(day))
                .map(|a| format!("{:.0}%", a * 100.0))
                .collect::<Vec<_>>()
                .join(" ");
            let up_rate = report
                .positive_rates
                .iter()
                .find(|(name, _)| *name == d.entity)
                .map(|(_, rate)| format!("{:.1}%", rate * 100.0))
                .unwrap_or_default();
            EntityRow {
                entity: d.entity.clone(),
                accuracy: format!("{:.2}%", d.accuracy() * 100.0),
                per_day,
                up_rate,
            }
        })
        .collect()
}

fn timeline_rows(evaluation: &EvaluationReport, entity: &str, limit: usize) -> Vec<TimelineRow> {
    let bits = |values: Vec<u8>| values.iter().map(u8::to_string).collect::<String>();
    evaluation
        .timeline(entity)
        .unwrap_or_default()
        .iter()
        .take(limit)
        .map(|outcome| TimelineRow {
            anchor: outcome
                .anchor_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| format!("#{}", outcome.sample_index)),
            predicted: bits(outcome.records.iter().map(|r| r.predicted).collect()),
            actual: bits(outcome.records.iter().map(|r| r.actual).collect()),
            hits: format!("{}/{}", outcome.correct_count(), outcome.records.len()),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    } else {
        (log::LevelFilter::Error, log::LevelFilter::Error)
    };

    let mut builder = env_logger::Builder::new();

    builder
        .filter(None, global_level)
        .filter(Some("trend_windows"), my_code_level)
        .parse_default_env()
        .init();

    let args = Cli::parse();
    let options = args.run_options()?;

    let source = CsvSource::new(&args.input);
    let observations = source
        .load_observations()
        .await
        .with_context(|| format!("Failed to load observations from {}", args.input.display()))?;
    log::info!("{}: {} row(s) loaded", source.signature(), observations.len());

    let dataset = PreparedDataset::prepare(&observations)?;
    drop(observations);

    // A bare flag (no path) means the configured default location
    if let Some(path) = args.save_scale.clone() {
        let path = path.unwrap_or_else(default_scale_record_path);
        save_scale_record(&path, dataset.scale())?;
    }
    if let Some(path) = args.sample_cache.clone() {
        let path = path.unwrap_or_else(|| SampleCache::default_path(&options.window));
        SampleCache::new(dataset.build_samples(&options.window)?).save_to_path(&path)?;
    }

    let mut classifier = ColumnFrequencyBaseline::new();
    let report = run_pipeline(
        &dataset,
        &mut classifier,
        &options,
        &mut |m| {
            log::info!(
                "Epoch {}: loss {:.4}, acc {:.3}, val_loss {}, val_acc {}",
                m.epoch,
                m.loss,
                m.accuracy,
                m.val_loss.map_or("-".to_string(), |v| format!("{:.4}", v)),
                m.val_accuracy.map_or("-".to_string(), |v| format!("{:.3}", v)),
            )
        },
        &CancelToken::new(),
    )?;

    println!(
        "{} | lookback {} | horizon {} | {} train / {} test | overall {:.2}%",
        report.classifier,
        report.window.lookback_length(),
        report.window.horizon_length(),
        report.train_len,
        report.test_len,
        report.evaluation.overall_accuracy() * 100.0
    );
    println!("{}", Table::new(accuracy_rows(&report)));

    if args.max_timeline > 0 {
        for entity in dataset.entities() {
            println!("\n{}", entity);
            println!(
                "{}",
                Table::new(timeline_rows(&report.evaluation, entity, args.max_timeline))
            );
        }
    }

    Ok(())
}
