mod common;

use common::{daily_config, daily_source, init_tracing, write_days, D0, DAY, HOUR};
use gridbeam::testing::{assert_results_eq, TelemetryDir};
use gridbeam::{
    AggregateTable, ColumnRequestConfig, ConfigError, FsRowSource, Runner, ScanMetrics,
};

fn both_modes(cfg: &gridbeam::AggregateConfig) -> anyhow::Result<(AggregateTable, AggregateTable)> {
    let threaded = Runner::default().aggregate(cfg, &FsRowSource, &ScanMetrics::new())?;
    let sequential = Runner::sequential().aggregate(cfg, &FsRowSource, &ScanMetrics::new())?;
    Ok((threaded, sequential))
}

fn assert_tables_match(a: &AggregateTable, b: &AggregateTable) {
    assert_eq!(a.epochs(), b.epochs());
    assert_eq!(a.column_names().collect::<Vec<_>>(), b.column_names().collect::<Vec<_>>());
    for (name, values) in a.columns() {
        assert_results_eq(values, b.column(name).expect("same columns"));
    }
}

#[test]
fn daily_files_end_to_end() -> anyhow::Result<()> {
    init_tracing();
    let dir = TelemetryDir::new()?;
    write_days(&dir, "ground", D0 - DAY, 3, "csv")?;

    let cfg = daily_config(
        vec![daily_source(&dir, "ground", "csv")],
        "2023-01-03T00:00:00Z",
        "2023-01-05T00:00:00Z",
        vec![
            ColumnRequestConfig::new("rain", "sum"),
            ColumnRequestConfig::new("rain", "count").output("rain_n"),
            ColumnRequestConfig::new("ap", "pick").output("ap_0"),
            ColumnRequestConfig::new("ap", "max").window("-6h_0h"),
        ],
    );
    let metrics = ScanMetrics::new();
    let table = Runner::default().aggregate(&cfg, &FsRowSource, &metrics)?;

    assert_eq!(table.epochs(), &[D0, D0 + DAY, D0 + 2 * DAY]);
    assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["rain", "rain_n", "ap_0", "ap"]);
    assert_results_eq(table.column("rain").unwrap(), &[24.0, 24.0, 23.0]);
    assert_results_eq(table.column("rain_n").unwrap(), &[24.0, 24.0, 23.0]);
    assert_results_eq(table.column("ap_0").unwrap(), &[0.0, 0.0, 23.0]);
    // [g - 6h, g] holds hours 18..23 of the previous day plus hour 0
    assert_results_eq(table.column("ap").unwrap(), &[23.0, 23.0, 23.0]);

    let m = metrics.snapshot();
    assert_eq!(m.files_opened, 3);
    assert_eq!(m.files_missing, 1);
    Ok(())
}

#[test]
fn threaded_and_sequential_agree() -> anyhow::Result<()> {
    let dir = TelemetryDir::new()?;
    write_days(&dir, "ground", D0 - DAY, 4, "csv")?;
    let cfg = daily_config(
        vec![daily_source(&dir, "ground", "csv")],
        "2023-01-02T00:00:00Z",
        "2023-01-06T00:00:00Z",
        vec![
            ColumnRequestConfig::new("rain", "sum").window("-16h59m59s_7h"),
            ColumnRequestConfig::new("ap", "mean"),
            ColumnRequestConfig::new("ap", "first").output("ap_first"),
            ColumnRequestConfig::new("ap", "last").output("ap_last"),
            ColumnRequestConfig::new("ap", "min").output("ap_min"),
            ColumnRequestConfig::new("ap", "pick").output("ap_noon").pick_offset("12h"),
        ],
    );
    let (threaded, sequential) = both_modes(&cfg)?;
    assert_tables_match(&threaded, &sequential);
    // the first slot's window ends exactly on the first row of the Jan 2 file
    assert_results_eq(threaded.column("ap_first").unwrap(), &[0.0, 1.0, 1.0, 1.0, 1.0]);
    Ok(())
}

#[test]
fn gzip_inputs_read_like_plain_ones() -> anyhow::Result<()> {
    let dir = TelemetryDir::new()?;
    write_days(&dir, "ground", D0, 2, "csv")?;
    write_days(&dir, "packed", D0, 2, "csv.gz")?;

    let requests = || {
        vec![
            ColumnRequestConfig::new("rain", "sum"),
            ColumnRequestConfig::new("ap", "pick").pick_offset("-1h"),
        ]
    };
    let plain = daily_config(
        vec![daily_source(&dir, "ground", "csv")],
        "2023-01-04T00:00:00Z",
        "2023-01-05T00:00:00Z",
        requests(),
    );
    let packed = daily_config(
        vec![daily_source(&dir, "packed", "csv.gz")],
        "2023-01-04T00:00:00Z",
        "2023-01-05T00:00:00Z",
        requests(),
    );
    let a = Runner::default().aggregate(&plain, &FsRowSource, &ScanMetrics::new())?;
    let b = Runner::default().aggregate(&packed, &FsRowSource, &ScanMetrics::new())?;
    assert_tables_match(&a, &b);
    assert_results_eq(a.column("ap").unwrap(), &[23.0, 23.0]);
    Ok(())
}

#[test]
fn each_column_reads_its_own_source() -> anyhow::Result<()> {
    let dir = TelemetryDir::new()?;
    write_days(&dir, "ground", D0 - DAY, 2, "csv")?;
    for d in 0..2 {
        let start = D0 - DAY + d * DAY;
        let text = gridbeam::testing::telemetry_csv(
            &["TIMESTAMP", "rain"],
            (0..24).map(|h| (start + h * HOUR, vec![Some(2.0)])),
        );
        dir.write(&common::day_file_name("tower", start, "csv"), &text)?;
    }

    let cfg = daily_config(
        vec![daily_source(&dir, "ground", "csv"), daily_source(&dir, "tower", "csv")],
        "2023-01-03T00:00:00Z",
        "2023-01-03T00:00:00Z",
        vec![
            ColumnRequestConfig::new("rain", "sum").output("ground_rain").source("ground"),
            ColumnRequestConfig::new("rain", "sum").output("tower_rain").source("tower"),
            ColumnRequestConfig::new("ap", "max").source("tower"),
        ],
    );
    let (threaded, sequential) = both_modes(&cfg)?;
    assert_tables_match(&threaded, &sequential);
    assert_results_eq(threaded.column("ground_rain").unwrap(), &[24.0]);
    assert_results_eq(threaded.column("tower_rain").unwrap(), &[48.0]);
    // tower files have no ap column
    assert_results_eq(threaded.column("ap").unwrap(), &[f64::NAN]);
    Ok(())
}

#[test]
fn time_offset_shifts_samples_onto_the_grid() -> anyhow::Result<()> {
    let dir = TelemetryDir::new()?;
    write_days(&dir, "ground", D0, 2, "csv")?;
    let mut cfg = daily_config(
        vec![daily_source(&dir, "ground", "csv")],
        "2023-01-04T00:00:00Z",
        "2023-01-04T00:00:00Z",
        vec![
            ColumnRequestConfig::new("ap", "pick"),
            ColumnRequestConfig::new("ap", "first").output("ap_first"),
        ],
    );
    cfg.time_offset = Some("-1h".to_string());
    let table = Runner::default().aggregate(&cfg, &FsRowSource, &ScanMetrics::new())?;
    // raw 01:00 on Jan 4 lands on the grid point; raw 02:00 on Jan 3 opens the window
    assert_results_eq(table.column("ap").unwrap(), &[1.0]);
    assert_results_eq(table.column("ap_first").unwrap(), &[2.0]);
    Ok(())
}

#[test]
fn missing_files_leave_empty_slots() -> anyhow::Result<()> {
    let dir = TelemetryDir::new()?;
    let cfg = daily_config(
        vec![daily_source(&dir, "ground", "csv")],
        "2023-01-03T00:00:00Z",
        "2023-01-04T00:00:00Z",
        vec![
            ColumnRequestConfig::new("rain", "sum"),
            ColumnRequestConfig::new("rain", "count").output("n"),
        ],
    );
    let (threaded, sequential) = both_modes(&cfg)?;
    assert_tables_match(&threaded, &sequential);
    assert_results_eq(threaded.column("rain").unwrap(), &[f64::NAN, f64::NAN]);
    assert_results_eq(threaded.column("n").unwrap(), &[0.0, 0.0]);
    Ok(())
}

#[test]
fn short_windows_drain_while_long_ones_keep_reading() -> anyhow::Result<()> {
    let dir = TelemetryDir::new()?;
    let text = gridbeam::testing::telemetry_csv(
        &["TIMESTAMP", "v"],
        (0..DAY).step_by(10).map(|s| (D0 + s, vec![Some(1.0)])),
    );
    dir.write(&common::day_file_name("ground", D0, "csv"), &text)?;

    let cfg = daily_config(
        vec![daily_source(&dir, "ground", "csv")],
        "2023-01-03T00:00:00Z",
        "2023-01-03T00:00:00Z",
        vec![
            ColumnRequestConfig::new("v", "count").window("0h_1m"),
            ColumnRequestConfig::new("v", "count").output("v_day").window("0h_23h59m59s"),
        ],
    );
    let table = Runner::threaded(1).aggregate(&cfg, &FsRowSource, &ScanMetrics::new())?;
    assert_results_eq(table.column("v").unwrap(), &[7.0]);
    assert_results_eq(table.column("v_day").unwrap(), &[8_640.0]);
    Ok(())
}

#[test]
fn config_errors_surface_before_any_io() {
    let dir = TelemetryDir::new().expect("temp dir");
    let cfg = daily_config(
        vec![daily_source(&dir, "ground", "csv")],
        "2023-01-03T00:00:00Z",
        "2023-01-04T00:00:00Z",
        vec![ColumnRequestConfig::new("rain", "sum").window("-25h_0h")],
    );
    let metrics = ScanMetrics::new();
    let err = Runner::default()
        .aggregate(&cfg, &FsRowSource, &metrics)
        .expect_err("window wider than the step");
    assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::WindowTooWide { .. })));
    assert_eq!(metrics.snapshot().files_missing + metrics.snapshot().files_opened, 0);
}
