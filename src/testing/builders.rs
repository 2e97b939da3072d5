//! Sample stream builders.

use crate::window::{Epoch, Sample};
use std::ops::RangeInclusive;

/// Fluent builder for ordered sample streams.
///
/// ```
/// use gridbeam::testing::SampleBuilder;
///
/// let samples = SampleBuilder::new().ramp(0..=3).set(1, 100.0).build();
/// assert_eq!(samples[1].value, 100.0);
/// assert_eq!(samples.len(), 4);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SampleBuilder {
    samples: Vec<Sample>,
}

impl SampleBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self { samples: Vec::new() }
    }

    /// One sample per epoch, valued as the epoch itself.
    #[must_use]
    pub fn ramp(mut self, epochs: RangeInclusive<Epoch>) -> Self {
        self.samples.extend(epochs.map(|e| Sample::new(e, e as f64)));
        self
    }

    /// Append `(epoch, value)`.
    #[must_use]
    pub fn add(mut self, epoch: Epoch, value: f64) -> Self {
        self.samples.push(Sample::new(epoch, value));
        self
    }

    /// Overwrite the value of every sample at `epoch`.
    #[must_use]
    pub fn set(mut self, epoch: Epoch, value: f64) -> Self {
        self.samples
            .iter_mut()
            .filter(|s| s.epoch == epoch)
            .for_each(|s| s.value = value);
        self
    }

    /// Append a constant-valued run `start, start + step, ...` up to `end`.
    #[must_use]
    pub fn every(mut self, start: Epoch, end: Epoch, step: i64, value: f64) -> Self {
        let mut e = start;
        while e <= end && step > 0 {
            self.samples.push(Sample::new(e, value));
            e += step;
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Vec<Sample> {
        self.samples
    }
}
