use aquahive_features::{
    compute_discharge_features, compute_param_features, select_param_site, select_site,
    FeatureError, FeatureTable, LagBucket, Parameter, Reading, Site,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0)
        .single()
        .expect("valid UTC timestamp expected")
}

fn reading(
    minutes: i64,
    parameter: Parameter,
    site: Site,
    value: f64,
    discharge: Option<f64>,
) -> Reading {
    Reading {
        timestamp: base() + Duration::minutes(minutes),
        parameter,
        site,
        value,
        discharge,
    }
}

fn hourly_discharge(site: Site, discharge: &[f64]) -> Vec<Reading> {
    discharge
        .iter()
        .enumerate()
        .map(|(idx, q)| reading(idx as i64 * 60, Parameter::Discharge, site.clone(), *q, Some(*q)))
        .collect()
}

fn bucket(start: i64, end: i64) -> LagBucket {
    LagBucket::new(start, end).expect("valid bucket")
}

fn column(table: &FeatureTable, name: &str) -> Vec<Option<f64>> {
    table.column(name).expect("column must exist")
}

/// Deterministic pseudo-random readings with a little jitter in cadence.
fn noisy_readings(parameter: Parameter, site: Site, points: usize) -> Vec<Reading> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 10_000) as f64 / 100.0
    };
    (0..points)
        .map(|idx| {
            let jitter = (idx % 3) as i64 * 7;
            let value = next();
            let discharge = if idx % 11 == 5 { None } else { Some(next()) };
            reading(idx as i64 * 60 + jitter, parameter.clone(), site.clone(), value, discharge)
        })
        .collect()
}

#[test]
fn discharge_bucket_one_to_three_matches_worked_example() {
    let readings = hourly_discharge(Site::Pinawa, &[10.0, 20.0, 30.0, 40.0]);
    let table = compute_discharge_features(&readings, &Site::Pinawa, bucket(1, 3));

    assert_eq!(
        table.column_names(),
        vec![
            "dschrg_pnwa_mean_1_3",
            "dschrg_pnwa_min_1_3",
            "dschrg_pnwa_max_1_3",
            "dschrg_pnwa_max_min_1_3"
        ]
    );
    assert_eq!(
        column(&table, "dschrg_pnwa_mean_1_3"),
        vec![None, Some(10.0), Some(15.0), Some(20.0)]
    );
    assert_eq!(table.rows[3].values, vec![Some(20.0), Some(10.0), Some(30.0), Some(20.0)]);
}

#[test]
fn later_bucket_is_shifted_three_rows() {
    let flows = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0];
    let readings = hourly_discharge(Site::Whitemouth, &flows);
    let near = compute_discharge_features(&readings, &Site::Whitemouth, bucket(1, 3));
    let far = compute_discharge_features(&readings, &Site::Whitemouth, bucket(4, 6));

    let near_mean = column(&near, "dschrg_wmth_mean_1_3");
    let far_mean = column(&far, "dschrg_wmth_mean_4_6");
    assert!(far_mean[..3].iter().all(Option::is_none));
    assert_eq!(&far_mean[3..], &near_mean[..near_mean.len() - 3]);
    // Row at T+6h reports the window [T, T+3h).
    assert_eq!(far_mean[6], Some(20.0));
}

#[test]
fn output_keys_match_the_canonical_series() {
    let readings = noisy_readings(Parameter::Toc, Site::Pinawa, 40);
    let series = select_param_site(&readings, &Parameter::Toc, &Site::Pinawa);

    for b in [bucket(1, 3), bucket(4, 6), bucket(2, 2), bucket(13, 15)] {
        let features =
            compute_param_features(&readings, &Parameter::Toc, &Site::Pinawa, b).expect("features");
        assert_eq!(features.concentration.rows.len(), series.len());
        assert_eq!(features.load.rows.len(), series.len());
        assert_eq!(features.concentration.timestamps(), series.timestamps());
        assert_eq!(features.load.timestamps(), series.timestamps());
    }
}

#[test]
fn recomputation_is_identical() {
    let readings = noisy_readings(Parameter::Turbidity, Site::Whitemouth, 30);
    let b = bucket(4, 6);
    let first = compute_param_features(&readings, &Parameter::Turbidity, &Site::Whitemouth, b)
        .expect("first run");
    let second = compute_param_features(&readings, &Parameter::Turbidity, &Site::Whitemouth, b)
        .expect("second run");
    assert_eq!(first, second);
}

#[test]
fn window_never_includes_its_own_row() {
    let readings = vec![
        reading(0, Parameter::Toc, Site::Pinawa, 1.0, Some(1.0)),
        reading(60, Parameter::Toc, Site::Pinawa, 100.0, Some(1.0)),
    ];
    let features = compute_param_features(&readings, &Parameter::Toc, &Site::Pinawa, bucket(1, 2))
        .expect("features");

    assert_eq!(column(&features.concentration, "toc_pnwa_mean_1_2"), vec![None, Some(1.0)]);
    assert_eq!(column(&features.concentration, "toc_pnwa_max_1_2"), vec![None, Some(1.0)]);
}

#[test]
fn range_is_absolute_spread() {
    let readings = noisy_readings(Parameter::Toc, Site::Whitemouth, 60);
    let features =
        compute_param_features(&readings, &Parameter::Toc, &Site::Whitemouth, bucket(1, 3))
            .expect("features");

    for table in [&features.concentration, &features.load] {
        for row in &table.rows {
            match (row.values[1], row.values[2], row.values[3]) {
                (Some(min), Some(max), Some(max_min)) => {
                    assert!(max_min >= 0.0);
                    assert!(((max - min).abs() - max_min).abs() < 1e-12);
                }
                (None, None, None) => {}
                other => panic!("partially populated row: {other:?}"),
            }
        }
    }
}

#[test]
fn missing_discharge_blanks_only_the_load() {
    let readings = vec![
        reading(0, Parameter::Toc, Site::Pinawa, 2.0, None),
        reading(60, Parameter::Toc, Site::Pinawa, 4.0, Some(3.0)),
    ];
    let features = compute_param_features(&readings, &Parameter::Toc, &Site::Pinawa, bucket(1, 2))
        .expect("features");

    // Row 1 sees only row 0: concentration present, load missing.
    assert_eq!(column(&features.concentration, "toc_pnwa_mean_1_2")[1], Some(2.0));
    assert_eq!(column(&features.load, "toc_pnwa_mean_load_1_2")[1], None);
}

#[test]
fn turbidity_load_uses_converted_concentration() {
    let readings = vec![
        reading(0, Parameter::Turbidity, Site::Pinawa, 30.0, Some(2.0)),
        reading(60, Parameter::Turbidity, Site::Pinawa, 60.0, Some(2.0)),
    ];
    let features =
        compute_param_features(&readings, &Parameter::Turbidity, &Site::Pinawa, bucket(1, 2))
            .expect("features");

    assert_eq!(column(&features.concentration, "turbidity_pnwa_mean_1_2")[1], Some(30.0));
    assert_eq!(column(&features.load, "turbidity_pnwa_mean_load_1_2")[1], Some(20.0));
}

#[test]
fn total_dissolved_solids_load_is_a_contract_violation() {
    let readings = vec![reading(0, Parameter::TotalDissolvedSolids, Site::Pinawa, 0.2, Some(5.0))];
    let err = compute_param_features(
        &readings,
        &Parameter::TotalDissolvedSolids,
        &Site::Pinawa,
        bucket(1, 3),
    )
    .expect_err("tds conversion is not implemented");

    assert!(matches!(err, FeatureError::UnimplementedConversion { .. }));
    assert!(err.is_contract_violation());
}

#[test]
fn invalid_buckets_fail_fast() {
    for (start, end) in [(0, 3), (5, 4), (-1, 2)] {
        let err = LagBucket::new(start, end).expect_err("invalid bucket must fail");
        assert!(matches!(err, FeatureError::InvalidLagBucket { .. }));
    }
}

#[test]
fn huge_bucket_aggregates_over_all_prior_rows() {
    let readings = hourly_discharge(Site::Pinawa, &[10.0, 20.0, 30.0]);
    let table = compute_discharge_features(&readings, &Site::Pinawa, bucket(1, 3_000_000_000));

    assert_eq!(table.rows.len(), 3);
    assert_eq!(
        column(&table, "dschrg_pnwa_mean_1_3000000000"),
        vec![None, Some(10.0), Some(15.0)]
    );
    assert_eq!(
        column(&table, "dschrg_pnwa_max_min_1_3000000000"),
        vec![None, Some(0.0), Some(10.0)]
    );
}

#[test]
fn short_and_empty_series_are_shaped_non_values() {
    let empty = compute_discharge_features(&[], &Site::Pinawa, bucket(4, 6));
    assert!(empty.rows.is_empty());
    assert_eq!(empty.schema.columns.len(), 4);

    let readings = hourly_discharge(Site::Pinawa, &[1.0, 2.0]);
    let short = compute_discharge_features(&readings, &Site::Pinawa, bucket(4, 6));
    assert_eq!(short.rows.len(), 2);
    assert!(short.rows.iter().all(|row| row.values.iter().all(Option::is_none)));
}

#[test]
fn discharge_selection_spans_every_parameter_at_the_site() {
    let readings = vec![
        reading(0, Parameter::Toc, Site::Pinawa, 9.0, Some(10.0)),
        reading(0, Parameter::Turbidity, Site::Pinawa, 3.0, Some(999.0)),
        reading(60, Parameter::Turbidity, Site::Pinawa, 3.0, Some(20.0)),
        reading(120, Parameter::Toc, Site::Whitemouth, 3.0, Some(500.0)),
        reading(120, Parameter::Toc, Site::Pinawa, 3.0, Some(30.0)),
    ];
    assert_eq!(select_site(&readings, &Site::Pinawa).len(), 3);

    let table = compute_discharge_features(&readings, &Site::Pinawa, bucket(1, 3));
    // First occurrence at T wins, so 999 never enters a window.
    assert_eq!(column(&table, "dschrg_pnwa_max_1_3")[2], Some(20.0));
}

#[test]
fn fall_back_hour_keeps_hourly_rows_distinct() {
    // 2023-11-05 02:00 CDT -> 01:00 CST in Winnipeg.
    let start = Utc
        .with_ymd_and_hms(2023, 11, 5, 4, 0, 0)
        .single()
        .expect("valid UTC timestamp expected");
    let readings: Vec<Reading> = (0..6)
        .map(|idx| Reading {
            timestamp: start + Duration::hours(idx),
            parameter: Parameter::Discharge,
            site: Site::Pinawa,
            value: 0.0,
            discharge: Some(idx as f64),
        })
        .collect();

    let table = compute_discharge_features(&readings, &Site::Pinawa, bucket(1, 2));
    assert_eq!(table.rows.len(), 6);
    assert!(table.rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    // Windows measure elapsed time, so the repeated wall-clock hour does not widen them.
    assert_eq!(column(&table, "dschrg_pnwa_mean_1_2")[4], Some(2.5));
}
