use super::{ColumnResult, Reducer, ReducerState, SlotAccumulator};
use crate::error::ConfigError;
use crate::window::{first_unordered_window, EpochWindow, Sample};
use std::sync::Arc;

/// Single-pass reducer over closed `[lo, hi]` windows, one per grid slot.
///
/// A sample inside the current window folds into the slot accumulator. A sample
/// past it commits the slot and advances, committing skipped slots with their
/// empty value, until a window reaches the sample. Samples before the current
/// window are ignored.
pub struct WindowedReducer<A: SlotAccumulator> {
    windows: Arc<[EpochWindow]>,
    result: ColumnResult,
    acc: A,
    slot: usize,
    state: ReducerState,
}

impl<A: SlotAccumulator> WindowedReducer<A> {
    pub fn new(windows: Arc<[EpochWindow]>) -> Result<Self, ConfigError> {
        if let Some(index) = first_unordered_window(&windows) {
            return Err(ConfigError::UnorderedWindows { column: A::KIND.to_string(), index });
        }
        let state = if windows.is_empty() { ReducerState::Draining } else { ReducerState::Reducing };
        Ok(Self {
            result: vec![A::KIND.empty_value(); windows.len()],
            windows,
            acc: A::default(),
            slot: 0,
            state,
        })
    }

    /// Write the open slot's value (if any sample contributed) and reset the accumulator.
    pub fn commit(&mut self) {
        if let Some(v) = self.acc.value() {
            self.result[self.slot] = v;
        }
        self.acc.reset();
    }

    /// Move to the next slot; past the last one the reducer starts draining.
    pub fn advance(&mut self) {
        self.slot += 1;
        if self.slot >= self.windows.len() {
            self.state = ReducerState::Draining;
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl<A: SlotAccumulator> Reducer for WindowedReducer<A> {
    fn push(&mut self, sample: Sample) {
        while self.state == ReducerState::Reducing {
            let window = self.windows[self.slot];
            if sample.epoch < window.lo {
                return;
            }
            if sample.epoch <= window.hi {
                self.acc.fold(sample.value);
                return;
            }
            self.commit();
            self.advance();
        }
    }

    fn state(&self) -> ReducerState {
        self.state
    }

    fn finish(mut self: Box<Self>) -> ColumnResult {
        if self.state == ReducerState::Reducing {
            self.commit();
        }
        self.state = ReducerState::Done;
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducers::{Count, Sum};

    fn windows(pairs: &[(i64, i64)]) -> Arc<[EpochWindow]> {
        pairs.iter().map(|&(lo, hi)| EpochWindow::new(lo, hi)).collect()
    }

    #[test]
    fn skipped_slots_keep_empty_value() {
        let mut r = Box::new(WindowedReducer::<Count>::new(windows(&[(0, 1), (2, 3), (4, 5)])).unwrap());
        r.push(Sample::new(0, 1.0));
        r.push(Sample::new(5, 1.0));
        assert_eq!(r.slot(), 2);
        assert_eq!(r.finish(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn drains_after_last_window() {
        let mut r = Box::new(WindowedReducer::<Sum>::new(windows(&[(0, 1)])).unwrap());
        r.push(Sample::new(1, 2.0));
        r.push(Sample::new(9, 5.0));
        assert_eq!(r.state(), ReducerState::Draining);
        r.push(Sample::new(10, 5.0));
        assert_eq!(r.finish(), vec![2.0]);
    }

    #[test]
    fn rejects_decreasing_windows() {
        assert!(matches!(
            WindowedReducer::<Sum>::new(windows(&[(0, 5), (1, 3)])),
            Err(ConfigError::UnorderedWindows { index: 1, .. })
        ));
    }
}
