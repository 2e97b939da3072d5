//! Testing utilities for aggregation runs.
//!
//! - **Assertions**: NaN-aware comparison of result columns
//! - **Builders**: ordered sample streams for driving reducers directly
//! - **Fixtures**: telemetry CSV files in a temporary directory
//! - **Mock I/O**: an in-memory [`RowSource`](crate::io::RowSource)
//!
//! ```
//! use gridbeam::reducers::{make_reducer, reduce_all, ReducerKind};
//! use gridbeam::planner::WindowSpec;
//! use gridbeam::testing::*;
//! use gridbeam::EpochWindow;
//!
//! let spec = WindowSpec::Windows(vec![EpochWindow::new(0, 4), EpochWindow::new(5, 9)].into());
//! let reducer = make_reducer(ReducerKind::Mean, &spec).unwrap();
//! let out = reduce_all(reducer, SampleBuilder::new().ramp(0..=3).build());
//! assert_results_eq(&out, &[1.5, f64::NAN]);
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod mock_io;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use mock_io::*;

