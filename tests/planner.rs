mod common;

use common::{daily_config, utc, D0, DAY};
use gridbeam::config::{AggregateJob, ColumnRequest, FileSource};
use gridbeam::planner::{ColumnPlan, Plan, ResultGrid, WindowSpec};
use gridbeam::{
    ColumnRequestConfig, ConfigError, EpochWindow, FileFrequency, FileSourceConfig, PointConfig,
    Precision, ReducerKind,
};
use std::sync::Arc;

fn source() -> FileSourceConfig {
    FileSourceConfig {
        name: Some("ground".to_string()),
        file_naming_template: "ground_%Y-%m-%d.csv".to_string(),
        file_frequency: "24h".to_string(),
    }
}

fn request(kind: ReducerKind, window: Option<(i64, i64)>, pick: Option<i64>) -> ColumnRequest {
    ColumnRequest {
        input: "x".to_string(),
        output: format!("x_{kind}"),
        kind,
        window: window.map(|(lo, hi)| EpochWindow { lo, hi }),
        pick,
        source: 0,
    }
}

fn job(start: i64, end: i64, step: i64, requests: Vec<ColumnRequest>) -> AggregateJob {
    AggregateJob {
        start,
        end,
        precision: Precision::Second,
        offset: 0,
        step,
        sources: vec![FileSource {
            name: "ground".to_string(),
            template: "ground_%Y-%m-%d.csv".to_string(),
            frequency: FileFrequency::Every(DAY),
        }],
        requests,
    }
}

#[test]
fn grid_length_and_order() -> anyhow::Result<()> {
    for (start, end, step) in [(0, 0, 1), (0, 9, 3), (5, 100, 7), (-50, 50, 10), (D0, D0 + 3 * DAY, DAY)] {
        let grid = ResultGrid::stepped(start, end, step, Precision::Second)?;
        assert_eq!(grid.len() as i64, (end - start) / step + 1);
        assert_eq!(grid.epochs()[0], start);
        assert!(grid.epochs().windows(2).all(|w| w[1] - w[0] == step));
        assert!(*grid.epochs().last().unwrap() <= end);
    }
    Ok(())
}

#[test]
fn windows_and_picks_follow_the_grid() -> anyhow::Result<()> {
    let plan = Plan::build(&job(
        100,
        120,
        10,
        vec![
            request(ReducerKind::Sum, Some((-4, 2)), None),
            request(ReducerKind::Pick, None, Some(3)),
        ],
    ))?;
    assert_eq!(&**plan.grid.epochs(), &[100, 110, 120]);
    assert_eq!(
        plan.columns[0].spec,
        WindowSpec::Windows(Arc::from([
            EpochWindow::new(96, 102),
            EpochWindow::new(106, 112),
            EpochWindow::new(116, 122),
        ]))
    );
    assert_eq!(plan.columns[1].spec, WindowSpec::Picks(Arc::from([103, 113, 123])));
    assert_eq!(plan.read_range, EpochWindow::new(96, 123));
    Ok(())
}

#[test]
fn default_window_is_the_step_ending_at_the_grid_point() -> anyhow::Result<()> {
    let cfg = daily_config(
        vec![source()],
        "2023-01-03T00:00:00Z",
        "2023-01-04T00:00:00Z",
        vec![ColumnRequestConfig::new("rain", "sum"), ColumnRequestConfig::new("ap", "pick").output("ap0")],
    );
    let plan = Plan::build(&cfg.validate()?)?;
    let WindowSpec::Windows(w) = &plan.columns[0].spec else {
        panic!("sum plans windows");
    };
    assert_eq!(w[0], EpochWindow::new(D0 - DAY + 1, D0));
    assert_eq!(w[1], EpochWindow::new(D0 + 1, D0 + DAY));
    assert_eq!(plan.columns[1].spec, WindowSpec::Picks(Arc::from([D0, D0 + DAY])));
    assert_eq!(plan.read_range, EpochWindow::new(D0 - DAY + 1, D0 + DAY));
    Ok(())
}

#[test]
fn read_range_spans_every_request() -> anyhow::Result<()> {
    let cfg = daily_config(
        vec![source()],
        "2023-01-03T00:00:00Z",
        "2023-01-03T00:00:00Z",
        vec![
            ColumnRequestConfig::new("rain", "sum").window("-16h59m59s_7h"),
            ColumnRequestConfig::new("ap", "max").window("-2h_0h"),
            ColumnRequestConfig::new("ap", "pick").output("ap_late").pick_offset("9h"),
        ],
    );
    let plan = Plan::build(&cfg.validate()?)?;
    assert_eq!(plan.grid.len(), 1);
    assert_eq!(plan.read_range, EpochWindow::new(D0 - 61_199, D0 + 9 * 3_600));
    Ok(())
}

#[test]
fn relative_window_errors() {
    let err = Plan::build(&job(0, 10, 10, vec![request(ReducerKind::Sum, Some((-11, 0)), None)])).unwrap_err();
    assert!(matches!(err, ConfigError::WindowTooWide { span: 11, step: 10, .. }));

    let err = Plan::build(&job(0, 10, 10, vec![request(ReducerKind::Sum, Some((3, 1)), None)])).unwrap_err();
    assert!(matches!(err, ConfigError::InvertedWindow { lo: 3, hi: 1, .. }));

    let err = Plan::build(&job(0, 10, 10, vec![request(ReducerKind::Pick, None, Some(11))])).unwrap_err();
    assert!(matches!(err, ConfigError::PickOffsetTooLarge { offset: 11, .. }));

    assert!(Plan::build(&job(0, 10, 10, vec![request(ReducerKind::Pick, None, Some(10))])).is_ok());
    assert_eq!(
        Plan::build(&job(11, 10, 10, vec![])).unwrap_err(),
        ConfigError::StartAfterEnd { start: "11".to_string(), end: "10".to_string() }
    );
}

#[test]
fn explicit_windows_are_checked_against_the_grid() {
    let grid = ResultGrid::from_epochs(vec![0, 10, 20], Precision::Second);
    let req = request(ReducerKind::Sum, None, None);

    let short = WindowSpec::Windows(Arc::from([EpochWindow::new(0, 1)]));
    assert!(matches!(
        ColumnPlan::explicit(req.clone(), short, &grid),
        Err(ConfigError::WindowCountMismatch { expected: 3, actual: 1, .. })
    ));

    let unordered = WindowSpec::Windows(Arc::from([
        EpochWindow::new(0, 5),
        EpochWindow::new(10, 15),
        EpochWindow::new(1, 2),
    ]));
    assert!(matches!(
        ColumnPlan::explicit(req.clone(), unordered, &grid),
        Err(ConfigError::UnorderedWindows { index: 2, .. })
    ));

    let ok = WindowSpec::Windows(Arc::from([
        EpochWindow::new(0, 5),
        EpochWindow::new(10, 15),
        EpochWindow::new(16, 20),
    ]));
    assert!(ColumnPlan::explicit(req, ok, &grid).is_ok());
}

#[test]
fn point_plan_is_one_absolute_slot() -> anyhow::Result<()> {
    let cfg = PointConfig {
        start_time: utc("2023-01-03T00:00:00Z"),
        end_time: utc("2023-01-03T12:00:00Z"),
        time_precision: "second".to_string(),
        time_offset: None,
        sources: vec![source()],
        requests: vec![
            ColumnRequestConfig::new("rain", "sum"),
            ColumnRequestConfig::new("ap", "pick"),
            ColumnRequestConfig::new("ap", "pick")
                .output("ap_noon")
                .pick_time(utc("2023-01-03T13:00:00Z")),
        ],
    };
    let plan = Plan::point(&cfg.validate()?)?;
    let end = D0 + 12 * 3_600;
    assert_eq!(&**plan.grid.epochs(), &[end]);
    assert_eq!(plan.columns[0].spec, WindowSpec::Windows(Arc::from([EpochWindow::new(D0, end)])));
    assert_eq!(plan.columns[1].spec, WindowSpec::Picks(Arc::from([end])));
    assert_eq!(plan.columns[2].spec, WindowSpec::Picks(Arc::from([end + 3_600])));
    assert_eq!(plan.read_range, EpochWindow::new(D0, end + 3_600));
    Ok(())
}

#[test]
fn plan_summary_names_every_column() -> anyhow::Result<()> {
    let cfg = daily_config(
        vec![source()],
        "2023-01-03T00:00:00Z",
        "2023-01-05T00:00:00Z",
        vec![ColumnRequestConfig::new("rain", "sum").output("rain_day")],
    );
    let text = Plan::build(&cfg.validate()?)?.to_string();
    assert!(text.contains("grid: 3 point(s) 2023-01-03 00:00:00 .. 2023-01-05 00:00:00"));
    assert!(text.contains("rain_day <- ground.rain [sum]"));
    Ok(())
}
