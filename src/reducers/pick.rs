use super::{ColumnResult, Reducer, ReducerState};
use crate::error::ConfigError;
use crate::window::{first_unordered_target, Epoch, Sample};
use std::sync::Arc;

/// Nearest-sample reducer.
///
/// Slot `i` accepts samples in `[mid(p[i-1], p[i]), mid(p[i], p[i+1])]`, unbounded at
/// the ends of the target list. A sample on a midpoint goes to the earlier slot while
/// that slot is still open. Bounds are compared on doubled values so midpoints never
/// round. Within a slot the first sample at the smallest distance wins, and an exact
/// hit closes the slot at once.
pub struct PickReducer {
    targets: Arc<[Epoch]>,
    result: ColumnResult,
    /// `(distance, value)` of the best candidate in the open slot.
    best: Option<(u128, f64)>,
    slot: usize,
    state: ReducerState,
}

impl PickReducer {
    pub fn new(targets: Arc<[Epoch]>) -> Result<Self, ConfigError> {
        if let Some(index) = first_unordered_target(&targets) {
            return Err(ConfigError::UnorderedWindows { column: "pick".to_string(), index });
        }
        let state = if targets.is_empty() { ReducerState::Draining } else { ReducerState::Reducing };
        Ok(Self {
            result: vec![f64::NAN; targets.len()],
            targets,
            best: None,
            slot: 0,
            state,
        })
    }

    /// Doubled lower bound of the open slot, inclusive.
    fn lower2(&self) -> Option<i128> {
        let i = self.slot;
        (i > 0).then(|| i128::from(self.targets[i - 1]) + i128::from(self.targets[i]))
    }

    /// Doubled upper bound of the open slot, inclusive.
    fn upper2(&self) -> Option<i128> {
        let i = self.slot;
        self.targets
            .get(i + 1)
            .map(|&next| i128::from(self.targets[i]) + i128::from(next))
    }

    pub fn commit(&mut self) {
        if let Some((_, v)) = self.best.take() {
            self.result[self.slot] = v;
        }
    }

    pub fn advance(&mut self) {
        self.slot += 1;
        if self.slot >= self.targets.len() {
            self.state = ReducerState::Draining;
        }
    }
}

impl Reducer for PickReducer {
    fn push(&mut self, sample: Sample) {
        let t2 = 2 * i128::from(sample.epoch);
        while self.state == ReducerState::Reducing {
            if self.lower2().is_some_and(|lo| t2 < lo) {
                return;
            }
            if self.upper2().is_some_and(|hi| t2 > hi) {
                self.commit();
                self.advance();
                continue;
            }

            let distance = (i128::from(sample.epoch) - i128::from(self.targets[self.slot])).unsigned_abs();
            if distance == 0 {
                self.best = Some((0, sample.value));
                self.commit();
                self.advance();
            } else if self.best.is_none_or(|(d, _)| distance < d) {
                self.best = Some((distance, sample.value));
            }
            return;
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

    #[test]
    fn exact_hit_closes_slot() {
        let mut r = Box::new(PickReducer::new(Arc::from([2, 6])).unwrap());
        r.push(Sample::new(2, 7.0));
        assert_eq!(r.slot, 1);
        // 3 is nearer to 2 than 6 but slot 0 is already closed
        r.push(Sample::new(3, 1.0));
        r.push(Sample::new(5, 9.0));
        assert_eq!(r.finish(), vec![7.0, 9.0]);
    }

    #[test]
    fn sample_crossing_a_boundary_is_evaluated_for_the_next_slot() {
        let mut r = Box::new(PickReducer::new(Arc::from([0, 10, 20])).unwrap());
        r.push(Sample::new(1, 1.0));
        r.push(Sample::new(16, 16.0));
        let out = r.finish();
        assert_eq!(out[0], 1.0);
        assert!(out[1].is_nan());
        assert_eq!(out[2], 16.0);
    }

    #[test]
    fn midpoint_sample_stays_in_the_open_slot() {
        let mut r = Box::new(PickReducer::new(Arc::from([0, 10, 20])).unwrap());
        r.push(Sample::new(5, 5.0));
        assert_eq!(r.slot, 0);
        r.push(Sample::new(15, 15.0));
        assert_eq!(r.slot, 1);
        let out = r.finish();
        assert_eq!(&out[..2], &[5.0, 15.0]);
        assert!(out[2].is_nan());
    }

    #[test]
    fn ties_keep_first_arrival() {
        let mut r = Box::new(PickReducer::new(Arc::from([10])).unwrap());
        r.push(Sample::new(8, 1.0));
        r.push(Sample::new(12, 2.0));
        assert_eq!(r.finish(), vec![1.0]);
    }
}
