//! Result assembly: the grid plus one finished column per request.

use crate::planner::Plan;
use crate::reducers::ColumnResult;
use crate::time::Precision;
use crate::window::Epoch;
use anyhow::{anyhow, ensure, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::sync::Arc;

/// Output of a grid aggregation.
///
/// Columns keep request order. Every column has one value per grid epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateTable {
    epochs: Arc<[Epoch]>,
    timestamps: Vec<DateTime<Utc>>,
    columns: IndexMap<String, Vec<f64>>,
    precision: Precision,
}

impl AggregateTable {
    /// Pair each plan column with its result, in plan order.
    pub fn assemble(plan: &Plan, results: Vec<ColumnResult>) -> Result<Self> {
        ensure!(
            results.len() == plan.columns.len(),
            "expected {} column results, got {}",
            plan.columns.len(),
            results.len()
        );
        let columns = plan
            .columns
            .iter()
            .zip(results)
            .map(|(c, values)| (c.request.output.clone(), values));
        Self::from_columns(plan.grid.epochs().clone(), plan.grid.precision(), columns)
    }

    pub fn from_columns(
        epochs: Arc<[Epoch]>,
        precision: Precision,
        columns: impl IntoIterator<Item = (String, Vec<f64>)>,
    ) -> Result<Self> {
        let timestamps = epochs
            .iter()
            .map(|&e| precision.to_datetime(e).ok_or_else(|| anyhow!("epoch {e} is out of range")))
            .collect::<Result<Vec<_>>>()?;
        let mut out = IndexMap::new();
        for (name, values) in columns {
            ensure!(
                values.len() == epochs.len(),
                "column {name:?} has {} values for {} grid points",
                values.len(),
                epochs.len()
            );
            out.insert(name, values);
        }
        Ok(Self { epochs, timestamps, columns: out, precision })
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns(&self) -> &IndexMap<String, Vec<f64>> {
        &self.columns
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Row `i`: timestamp and one value per column.
    pub fn row(&self, i: usize) -> Option<(DateTime<Utc>, Vec<f64>)> {
        let ts = *self.timestamps.get(i)?;
        Some((ts, self.columns.values().map(|c| c[i]).collect()))
    }

    pub fn rows(&self) -> impl Iterator<Item = (DateTime<Utc>, Vec<f64>)> + '_ {
        (0..self.len()).filter_map(move |i| self.row(i))
    }
}
