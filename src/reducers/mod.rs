//! Column reducers: one state machine per output column.
//!
//! A reducer consumes its column's samples in timestamp order and writes exactly one
//! value per grid slot. Every reducer moves through the same states:
//!
//! ```text
//! Reducing --(slots exhausted)--> Draining --(input closed)--> Done
//!     \______________________(input closed)_____________________/
//! ```
//!
//! Windowed kinds ([`WindowedReducer`]) fold samples into per-slot
//! [`SlotAccumulator`]s; [`PickReducer`] keeps the sample nearest each target.
//! A reducer never fails and never stops consuming its input before it is closed,
//! so a producer can always complete its sends.

mod accumulators;
mod pick;
mod windowed;

pub use accumulators::{Count, First, Last, Max, Mean, Min, SlotAccumulator, Sum};
pub use pick::PickReducer;
pub use windowed::WindowedReducer;

use crate::error::ConfigError;
use crate::planner::WindowSpec;
use crate::window::Sample;
use crossbeam::channel::Receiver;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::str::FromStr;
use tracing::trace;

/// One value per grid slot; `NaN` marks a slot no sample contributed to.
pub type ColumnResult = Vec<f64>;

/// Reduction rule of one output column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReducerKind {
    Sum,
    Count,
    Mean,
    Min,
    Max,
    First,
    Last,
    /// Sample nearest to each slot's target time.
    Pick,
}

impl ReducerKind {
    /// Value of a slot that received no sample.
    pub fn empty_value(self) -> f64 {
        match self {
            ReducerKind::Count => 0.0,
            _ => f64::NAN,
        }
    }
}

impl FromStr for ReducerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "sum" => ReducerKind::Sum,
            "count" => ReducerKind::Count,
            "mean" => ReducerKind::Mean,
            "min" => ReducerKind::Min,
            "max" => ReducerKind::Max,
            "first" => ReducerKind::First,
            "last" => ReducerKind::Last,
            "pick" => ReducerKind::Pick,
            other => return Err(ConfigError::InvalidMethod(other.to_string())),
        })
    }
}

impl Display for ReducerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(match self {
            ReducerKind::Sum => "sum",
            ReducerKind::Count => "count",
            ReducerKind::Mean => "mean",
            ReducerKind::Min => "min",
            ReducerKind::Max => "max",
            ReducerKind::First => "first",
            ReducerKind::Last => "last",
            ReducerKind::Pick => "pick",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReducerState {
    Reducing,
    /// Every slot is committed; input is discarded until it closes.
    Draining,
    Done,
}

/// A per-column reduction state machine.
pub trait Reducer: Send {
    /// Feed the next sample. Samples must arrive in non-decreasing epoch order.
    fn push(&mut self, sample: Sample);

    fn state(&self) -> ReducerState;

    /// Close the input: commit the open slot and hand off the result.
    fn finish(self: Box<Self>) -> ColumnResult;
}

/// Build the reducer for `kind` over an explicit window list.
///
/// Fails when the list is out of order or does not match the kind.
pub fn make_reducer(kind: ReducerKind, spec: &WindowSpec) -> Result<Box<dyn Reducer>, ConfigError> {
    Ok(match (kind, spec) {
        (ReducerKind::Pick, WindowSpec::Picks(targets)) => Box::new(PickReducer::new(targets.clone())?),
        (ReducerKind::Sum, WindowSpec::Windows(w)) => Box::new(WindowedReducer::<Sum>::new(w.clone())?),
        (ReducerKind::Count, WindowSpec::Windows(w)) => Box::new(WindowedReducer::<Count>::new(w.clone())?),
        (ReducerKind::Mean, WindowSpec::Windows(w)) => Box::new(WindowedReducer::<Mean>::new(w.clone())?),
        (ReducerKind::Min, WindowSpec::Windows(w)) => Box::new(WindowedReducer::<Min>::new(w.clone())?),
        (ReducerKind::Max, WindowSpec::Windows(w)) => Box::new(WindowedReducer::<Max>::new(w.clone())?),
        (ReducerKind::First, WindowSpec::Windows(w)) => Box::new(WindowedReducer::<First>::new(w.clone())?),
        (ReducerKind::Last, WindowSpec::Windows(w)) => Box::new(WindowedReducer::<Last>::new(w.clone())?),
        (kind, _) => return Err(ConfigError::InvalidMethod(kind.to_string())),
    })
}

/// Consume `rx` until every sender is dropped, then finish the reducer.
///
/// Samples arriving after the reducer starts draining are received and dropped, so
/// a producer blocked on a full channel is always released.
pub fn reduce_channel(mut reducer: Box<dyn Reducer>, rx: Receiver<Sample>) -> ColumnResult {
    let mut received = 0u64;
    let mut discarded = 0u64;
    for sample in rx.iter() {
        received += 1;
        if reducer.state() == ReducerState::Reducing {
            reducer.push(sample);
        } else {
            discarded += 1;
        }
    }
    trace!(received, discarded, "reducer input closed");
    reducer.finish()
}

/// Feed a whole sample slice and finish. Used by the sequential runner and tests.
pub fn reduce_all(mut reducer: Box<dyn Reducer>, samples: impl IntoIterator<Item = Sample>) -> ColumnResult {
    for sample in samples {
        if reducer.state() != ReducerState::Reducing {
            break;
        }
        reducer.push(sample);
    }
    reducer.finish()
}
