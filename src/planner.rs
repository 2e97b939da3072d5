//! Time-grid planner.
//!
//! Turns a validated job into a [`Plan`]:
//!
//! 1. **Result grid** -- `start, start + step, ...` up to and including `end` when it
//!    lies on the lattice, shared by every reducer as an `Arc<[Epoch]>`.
//! 2. **Per-column window lists** -- each request's relative window (or pick offset)
//!    added to every grid point, one entry per grid slot.
//! 3. **Read range** -- the smallest absolute range covering every window and pick
//!    target, which the scanners use to pick files and filter rows.
//!
//! Point jobs plan a single slot at `end` with absolute windows instead.

use crate::config::{AggregateJob, ColumnRequest, FileSource, PointJob};
use crate::error::ConfigError;
use crate::reducers::ReducerKind;
use crate::time::Precision;
use crate::window::{first_unordered_target, first_unordered_window, Epoch, EpochWindow};
use rayon::prelude::*;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::sync::Arc;

/// Ascending grid of absolute epochs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultGrid {
    epochs: Arc<[Epoch]>,
    precision: Precision,
}

impl ResultGrid {
    /// `floor((end - start) / step) + 1` points from `start`.
    pub fn stepped(start: Epoch, end: Epoch, step: i64, precision: Precision) -> Result<Self, ConfigError> {
        if step <= 0 {
            return Err(ConfigError::NonPositiveStep(step));
        }
        if start > end {
            return Err(ConfigError::StartAfterEnd {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        let len = (end - start) / step + 1;
        let epochs: Vec<Epoch> = (0..len).map(|i| start + i * step).collect();
        Ok(Self { epochs: epochs.into(), precision })
    }

    pub fn from_epochs(epochs: impl Into<Arc<[Epoch]>>, precision: Precision) -> Self {
        Self { epochs: epochs.into(), precision }
    }

    #[inline]
    pub fn epochs(&self) -> &Arc<[Epoch]> {
        &self.epochs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    #[inline]
    pub fn precision(&self) -> Precision {
        self.precision
    }
}

/// Absolute per-slot windows of one column, aligned 1:1 with the grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WindowSpec {
    Windows(Arc<[EpochWindow]>),
    Picks(Arc<[Epoch]>),
}

impl WindowSpec {
    pub fn len(&self) -> usize {
        match self {
            WindowSpec::Windows(w) => w.len(),
            WindowSpec::Picks(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the first slot that breaks `lo <= hi` / non-decreasing order.
    pub fn first_unordered(&self) -> Option<usize> {
        match self {
            WindowSpec::Windows(w) => first_unordered_window(w),
            WindowSpec::Picks(p) => first_unordered_target(p),
        }
    }

    fn bounds(&self) -> Option<(Epoch, Epoch)> {
        match self {
            WindowSpec::Windows(w) => Some((w.iter().map(|w| w.lo).min()?, w.last()?.hi)),
            WindowSpec::Picks(p) => Some((*p.first()?, *p.last()?)),
        }
    }
}

/// One output column: its request and absolute windows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnPlan {
    pub request: ColumnRequest,
    pub spec: WindowSpec,
}

impl ColumnPlan {
    /// Pair a request with an explicit window list, checking length and ordering.
    pub fn explicit(request: ColumnRequest, spec: WindowSpec, grid: &ResultGrid) -> Result<Self, ConfigError> {
        if spec.len() != grid.len() {
            return Err(ConfigError::WindowCountMismatch {
                column: request.output,
                expected: grid.len(),
                actual: spec.len(),
            });
        }
        if let Some(index) = spec.first_unordered() {
            return Err(ConfigError::UnorderedWindows { column: request.output, index });
        }
        let kind_matches = matches!(
            (&spec, request.kind),
            (WindowSpec::Picks(_), ReducerKind::Pick)
        ) || (matches!(spec, WindowSpec::Windows(_)) && request.kind != ReducerKind::Pick);
        if !kind_matches {
            return Err(ConfigError::InvalidMethod(request.kind.to_string()));
        }
        Ok(Self { request, spec })
    }
}

/// A finalized aggregation plan.
#[derive(Clone, Debug)]
pub struct Plan {
    pub grid: ResultGrid,
    pub columns: Vec<ColumnPlan>,
    /// Absolute, offset-adjusted range the scanners must cover.
    pub read_range: EpochWindow,
    /// Added to raw file timestamps.
    pub offset: i64,
    pub sources: Vec<FileSource>,
}

impl Plan {
    /// Plan a grid job.
    pub fn build(job: &AggregateJob) -> Result<Self, ConfigError> {
        let grid = ResultGrid::stepped(job.start, job.end, job.step, job.precision)?;
        for req in &job.requests {
            check_relative(req, job.step)?;
        }

        let epochs = grid.epochs();
        let columns: Vec<ColumnPlan> = job
            .requests
            .par_iter()
            .map(|req| {
                let spec = match (req.window, req.pick) {
                    (_, Some(offset)) => WindowSpec::Picks(epochs.iter().map(|g| g + offset).collect()),
                    (Some(w), None) => WindowSpec::Windows(epochs.iter().map(|&g| w.shifted(g)).collect()),
                    (None, None) => WindowSpec::Windows(
                        epochs.iter().map(|&g| EpochWindow::new(g + 1 - job.step, g)).collect(),
                    ),
                };
                ColumnPlan { request: req.clone(), spec }
            })
            .collect();

        let read_range = covering_range(&columns).unwrap_or(EpochWindow::new(job.start, job.end));
        Ok(Self {
            grid,
            columns,
            read_range,
            offset: job.offset,
            sources: job.sources.clone(),
        })
    }

    /// Plan a point job: one slot at `end`, absolute windows.
    pub fn point(job: &PointJob) -> Result<Self, ConfigError> {
        if job.start > job.end {
            return Err(ConfigError::StartAfterEnd {
                start: job.start.to_string(),
                end: job.end.to_string(),
            });
        }
        let grid = ResultGrid::from_epochs(vec![job.end], job.precision);
        let columns: Vec<ColumnPlan> = job
            .requests
            .iter()
            .map(|req| {
                let spec = match req.pick {
                    Some(at) => WindowSpec::Picks(Arc::from([at])),
                    None => WindowSpec::Windows(Arc::from([req
                        .window
                        .unwrap_or(EpochWindow::new(job.start, job.end))])),
                };
                ColumnPlan::explicit(req.clone(), spec, &grid)
            })
            .collect::<Result<_, _>>()?;

        let read_range = match covering_range(&columns) {
            Some(r) => EpochWindow::new(r.lo.min(job.start), r.hi.max(job.end)),
            None => EpochWindow::new(job.start, job.end),
        };
        Ok(Self {
            grid,
            columns,
            read_range,
            offset: job.offset,
            sources: vec![job.source.clone()],
        })
    }

    /// Column plans bound to source `index`.
    pub fn columns_for_source(&self, index: usize) -> impl Iterator<Item = (usize, &ColumnPlan)> {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.request.source == index)
    }
}

fn check_relative(req: &ColumnRequest, step: i64) -> Result<(), ConfigError> {
    if let Some(offset) = req.pick {
        if offset > step {
            return Err(ConfigError::PickOffsetTooLarge {
                column: req.output.clone(),
                offset,
                step,
            });
        }
        return Ok(());
    }
    if let Some(w) = req.window {
        if w.lo > w.hi {
            return Err(ConfigError::InvertedWindow {
                column: req.output.clone(),
                lo: w.lo,
                hi: w.hi,
            });
        }
        if w.hi - w.lo > step {
            return Err(ConfigError::WindowTooWide {
                column: req.output.clone(),
                span: w.hi - w.lo,
                step,
            });
        }
    }
    Ok(())
}

fn covering_range(columns: &[ColumnPlan]) -> Option<EpochWindow> {
    let (lo, hi) = columns
        .iter()
        .filter_map(|c| c.spec.bounds())
        .reduce(|(a_lo, a_hi), (b_lo, b_hi)| (a_lo.min(b_lo), a_hi.max(b_hi)))?;
    Some(EpochWindow::new(lo, hi))
}

impl Display for Plan {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        let precision = self.grid.precision();
        let stamp = |e: Epoch| {
            precision
                .to_datetime(e)
                .map_or_else(|| e.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        };
        let epochs = self.grid.epochs();
        match (epochs.first(), epochs.last()) {
            (Some(&first), Some(&last)) => writeln!(
                f,
                "grid: {} point(s) {} .. {} ({precision})",
                self.grid.len(),
                stamp(first),
                stamp(last)
            )?,
            _ => writeln!(f, "grid: empty")?,
        }
        writeln!(
            f,
            "read range: {} .. {} (offset {})",
            stamp(self.read_range.lo),
            stamp(self.read_range.hi),
            self.offset
        )?;
        for column in &self.columns {
            let req = &column.request;
            let source = self.sources.get(req.source).map_or("?", |s| s.name.as_str());
            write!(f, "  {} <- {}.{} [{}]", req.output, source, req.input, req.kind)?;
            match &column.spec {
                WindowSpec::Windows(w) => match w.first() {
                    Some(first) => writeln!(f, " first window {} .. {}", stamp(first.lo), stamp(first.hi))?,
                    None => writeln!(f)?,
                },
                WindowSpec::Picks(p) => match p.first() {
                    Some(&first) => writeln!(f, " first target {}", stamp(first))?,
                    None => writeln!(f)?,
                },
            }
        }
        Ok(())
    }
}
