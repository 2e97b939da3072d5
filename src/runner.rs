//! Execution: wiring scanners to reducers.
//!
//! [`ExecMode::Threaded`] runs one scoped thread per source scanner and one per
//! column reducer, connected by bounded crossbeam channels; a full channel blocks
//! the scanner, which is the only backpressure. Each channel has exactly one
//! sender, held by the scanner of the column's source, so it closes as soon as
//! that scanner returns. [`ExecMode::Sequential`] runs the scanners one after the
//! other on the calling thread and pushes samples straight into the reducers.

use crate::assembler::AggregateTable;
use crate::config::{AggregateConfig, PointConfig};
use crate::io::RowSource;
use crate::metrics::ScanMetrics;
use crate::planner::Plan;
use crate::reducers::{make_reducer, reduce_channel, ColumnResult, Reducer};
use crate::scanner::{ChannelSink, SourceScanner};
use anyhow::{anyhow, Result};
use crossbeam::channel::bounded;
use indexmap::IndexMap;
use std::thread;
use tracing::{debug, info};

/// Default capacity of each reducer's input channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    Threaded { channel_capacity: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct Runner {
    pub mode: ExecMode,
}

impl Default for Runner {
    fn default() -> Self {
        Self { mode: ExecMode::Threaded { channel_capacity: DEFAULT_CHANNEL_CAPACITY } }
    }
}

impl Runner {
    pub fn sequential() -> Self {
        Self { mode: ExecMode::Sequential }
    }

    pub fn threaded(channel_capacity: usize) -> Self {
        Self { mode: ExecMode::Threaded { channel_capacity: channel_capacity.max(1) } }
    }

    /// Validate, plan, scan and assemble a grid aggregation.
    pub fn aggregate(
        &self,
        config: &AggregateConfig,
        rows: &dyn RowSource,
        metrics: &ScanMetrics,
    ) -> Result<AggregateTable> {
        let job = config.validate()?;
        let plan = Plan::build(&job)?;
        let results = self.run_plan(&plan, rows, metrics)?;
        AggregateTable::assemble(&plan, results)
    }

    /// Validate, plan and scan a point aggregation: one value per output column.
    pub fn aggregate_point(
        &self,
        config: &PointConfig,
        rows: &dyn RowSource,
        metrics: &ScanMetrics,
    ) -> Result<IndexMap<String, f64>> {
        let job = config.validate()?;
        let plan = Plan::point(&job)?;
        let results = self.run_plan(&plan, rows, metrics)?;
        Ok(plan
            .columns
            .iter()
            .zip(results)
            .map(|(c, r)| (c.request.output.clone(), r.first().copied().unwrap_or(f64::NAN)))
            .collect())
    }

    /// Run a finished plan; results come back in plan column order.
    pub fn run_plan(&self, plan: &Plan, rows: &dyn RowSource, metrics: &ScanMetrics) -> Result<Vec<ColumnResult>> {
        let reducers = plan
            .columns
            .iter()
            .map(|c| make_reducer(c.request.kind, &c.spec))
            .collect::<Result<Vec<_>, _>>()?;
        let scanners = (0..plan.sources.len())
            .map(|i| SourceScanner::for_source(plan, i).ok_or_else(|| anyhow!("missing source #{i}")))
            .collect::<Result<Vec<_>>>()?;

        info!(
            mode = ?self.mode,
            grid = plan.grid.len(),
            columns = plan.columns.len(),
            sources = scanners.len(),
            "starting aggregation"
        );
        debug!("plan:\n{plan}");

        metrics.record_start();
        let results = match self.mode {
            ExecMode::Sequential => Ok(run_sequential(reducers, &scanners, rows, metrics)),
            ExecMode::Threaded { channel_capacity } => {
                run_threaded(plan, reducers, &scanners, rows, metrics, channel_capacity)
            }
        };
        metrics.record_end();
        info!(elapsed = ?metrics.elapsed(), "aggregation finished");
        results
    }
}

fn run_sequential(
    mut reducers: Vec<Box<dyn Reducer>>,
    scanners: &[SourceScanner],
    rows: &dyn RowSource,
    metrics: &ScanMetrics,
) -> Vec<ColumnResult> {
    for scanner in scanners {
        scanner.scan(rows, &mut reducers, metrics);
    }
    reducers.into_iter().map(|r| r.finish()).collect()
}

fn run_threaded(
    plan: &Plan,
    reducers: Vec<Box<dyn Reducer>>,
    scanners: &[SourceScanner],
    rows: &dyn RowSource,
    metrics: &ScanMetrics,
    capacity: usize,
) -> Result<Vec<ColumnResult>> {
    let columns = plan.columns.len();
    thread::scope(|s| {
        let mut sinks: Vec<ChannelSink> = scanners.iter().map(|_| ChannelSink::new(columns)).collect();

        let mut reducer_handles = Vec::with_capacity(columns);
        for (column, reducer) in reducers.into_iter().enumerate() {
            let (tx, rx) = bounded(capacity);
            sinks[plan.columns[column].request.source].bind(column, tx);
            reducer_handles.push(s.spawn(move || reduce_channel(reducer, rx)));
        }

        let scanner_handles: Vec<_> = scanners
            .iter()
            .zip(sinks)
            .map(|(scanner, mut sink)| s.spawn(move || scanner.scan(rows, &mut sink, metrics)))
            .collect();

        for handle in scanner_handles {
            handle.join().map_err(|_| anyhow!("scanner thread panicked"))?;
        }
        reducer_handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow!("reducer thread panicked")))
            .collect()
    })
}
