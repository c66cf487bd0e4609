use chrono::{Duration, NaiveDate};
use ndarray::array;
use trend_windows::{
    Field, Observation, PipelineError, PreparedDataset, WindowConfig,
    models::{build_pivot, evaluate, forward_fill, split_chronological},
    utils::format_date_key,
};

fn day(offset: usize) -> String {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    format_date_key(start + Duration::days(offset as i64))
}

/// Three entities with deterministic wiggle and a few gaps.
fn table(days: usize) -> Vec<Observation> {
    let mut rows = Vec::new();
    for i in 0..days {
        for (k, entity) in ["GAMMA", "ALPHA", "BETA"].iter().enumerate() {
            // BETA misses every seventh day, GAMMA starts late
            if (*entity == "BETA" && i % 7 == 3) || (*entity == "GAMMA" && i < 4) {
                continue;
            }
            let v = 50.0 + ((i * (k + 3) * 17) % 23) as f64 - k as f64;
            rows.push(Observation::new(day(i), *entity, v, v + 0.5));
        }
    }
    rows
}

#[test]
fn split_sizes_hold_for_several_windows() {
    let dataset = PreparedDataset::prepare(&table(80)).unwrap();
    for (lookback, horizon) in [(12, 3), (5, 1), (1, 1), (20, 7)] {
        let samples = dataset
            .build_samples(&WindowConfig::new(lookback, horizon).unwrap())
            .unwrap();
        let n = samples.len();
        let split = split_chronological(samples, 0.8).unwrap();
        assert_eq!(split.train.len() + split.test.len(), n);
        assert_eq!(split.train.len(), (n as f64 * 0.8).floor() as usize);
    }
}

#[test]
fn only_leading_holes_survive_gap_fill() {
    let pivot = build_pivot(&table(30)).unwrap();
    let (filled, _) = forward_fill(&pivot);

    for (entity_index, series) in filled.series().iter().enumerate() {
        for field in [Field::Open, Field::Close] {
            let values = series.field(field);
            let first = values.iter().position(Option::is_some).unwrap();
            assert!(values[first..].iter().all(Option::is_some));

            let raw = pivot.series()[entity_index].field(field);
            for i in first..values.len() {
                let nearest = raw[..=i].iter().rev().find_map(|v| *v);
                assert_eq!(values[i], nearest);
            }
        }
    }
    assert_eq!(filled.entities().as_slice(), ["ALPHA", "BETA", "GAMMA"]);
}

#[test]
fn boundary_anchors_for_lookback_12_horizon_3() {
    let rows: Vec<Observation> = (0..20)
        .map(|i| Observation::new(day(i), "ONLY", i as f64, i as f64))
        .collect();
    let dataset = PreparedDataset::prepare(&rows).unwrap();
    let samples = dataset.build_samples(&WindowConfig::new(12, 3).unwrap()).unwrap();
    let anchors: Vec<usize> = samples.samples().iter().map(|s| s.anchor_index).collect();
    // i - 12 >= 0 and i + 3 <= 19
    assert_eq!(anchors, vec![12, 13, 14, 15, 16]);
}

#[test]
fn labels_compare_against_anchor_close() {
    // 0 and 10 pin the range, so normalized close is [0.0, 0.2, 0.5, 0.1, 0.9, 1.0]
    let closes = [0.0, 2.0, 5.0, 1.0, 9.0, 10.0];
    let rows: Vec<Observation> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Observation::new(day(i), "E", 1.0, c))
        .collect();
    let dataset = PreparedDataset::prepare(&rows).unwrap();
    let samples = dataset.build_samples(&WindowConfig::new(2, 2).unwrap()).unwrap();
    assert_eq!(samples.len(), 2);
    // Anchor 2 (0.5): 0.1 is down, 0.9 is up
    let anchored = &samples.samples()[0];
    assert_eq!(anchored.anchor_index, 2);
    assert_eq!(anchored.labels(), &[0, 1]);
    // Anchor 3 (0.1): both later closes are higher
    assert_eq!(samples.samples()[1].labels(), &[1, 1]);
}

#[test]
fn tensors_line_up_with_samples() {
    let dataset = PreparedDataset::prepare(&table(40)).unwrap();
    let samples = dataset.build_samples(&WindowConfig::new(6, 2).unwrap()).unwrap();
    let inputs = samples.inputs_tensor();
    let labels = samples.label_matrix();
    assert_eq!(inputs.dim(), (samples.len(), 6, 3 * 2));
    assert_eq!(labels.dim(), (samples.len(), 3 * 2));
    assert_eq!(inputs.index_axis(ndarray::Axis(0), 0), samples.samples()[0].inputs());
    assert_eq!(samples.anchor_dates().len(), samples.len());
}

#[test]
fn evaluation_of_single_two_day_sample() {
    let report = evaluate(
        array![[0.9, 0.4]].view(),
        array![[1u8, 1]].view(),
        &["E".to_string()],
        2,
    )
    .unwrap();
    assert_eq!(report.accuracy("E"), Some(0.5));
    let outcome = &report.timeline("E").unwrap()[0];
    assert_eq!(
        outcome.records.iter().map(|r| (r.predicted, r.actual, r.correct)).collect::<Vec<_>>(),
        vec![(1, 1, true), (0, 1, false)]
    );
}

#[test]
fn full_pipeline_is_deterministic() {
    let rows = table(60);
    let config = WindowConfig::new(8, 3).unwrap();

    let first = PreparedDataset::prepare(&rows).unwrap();
    let second = PreparedDataset::prepare(&rows).unwrap();
    assert_eq!(first.normalized(), second.normalized());

    let a = first.build_samples(&config).unwrap();
    let b = second.build_samples(&config).unwrap();
    assert_eq!(a, b);

    // Input order does not matter either
    let mut reversed = rows.clone();
    reversed.reverse();
    let c = PreparedDataset::prepare(&reversed).unwrap().build_samples(&config).unwrap();
    assert_eq!(a, c);
}

#[test]
fn rebuilding_windows_leaves_the_dataset_untouched() {
    let dataset = PreparedDataset::prepare(&table(50)).unwrap();
    let before = dataset.normalized().clone();
    let scale = dataset.scale().clone();
    for lookback in 1..10 {
        let _ = dataset.build_samples(&WindowConfig::new(lookback, 2).unwrap());
    }
    assert_eq!(dataset.normalized(), &before);
    assert_eq!(dataset.scale(), &scale);
}

#[test]
fn short_history_is_insufficient_data() {
    let rows: Vec<Observation> = (0..15)
        .map(|i| Observation::new(day(i), "E", 1.0, i as f64))
        .collect();
    let dataset = PreparedDataset::prepare(&rows).unwrap();
    // 15 <= 12 + 3
    assert!(matches!(
        dataset.build_samples(&WindowConfig::new(12, 3).unwrap()),
        Err(PipelineError::InsufficientData { .. })
    ));
    assert!(dataset.build_samples(&WindowConfig::new(11, 3).unwrap()).is_ok());
}

#[test]
fn missing_close_is_malformed_row() {
    let mut rows = table(5);
    rows[4].close = None;
    assert!(matches!(
        PreparedDataset::prepare(&rows),
        Err(PipelineError::MalformedRow { row: 5, field: "close", .. })
    ));
}
