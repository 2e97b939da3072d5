use serde::{Deserialize, Serialize};

/// Integer timestamp in the run's [`Precision`](crate::Precision) unit.
pub type Epoch = i64;

/// A closed time range: [lo, hi].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpochWindow {
    pub lo: Epoch,
    pub hi: Epoch,
}

impl EpochWindow {
    #[inline]
    pub fn new(lo: Epoch, hi: Epoch) -> Self {
        debug_assert!(hi >= lo);
        Self { lo, hi }
    }

    #[inline]
    pub fn contains(&self, epoch: Epoch) -> bool {
        epoch >= self.lo && epoch <= self.hi
    }

    /// Shift both bounds by `offset`.
    #[inline]
    pub fn shifted(&self, offset: Epoch) -> Self {
        Self { lo: self.lo + offset, hi: self.hi + offset }
    }

    /// Width of the window, `hi - lo`.
    #[inline]
    pub fn span(&self) -> Epoch {
        self.hi - self.lo
    }
}

/// Lattice floor: the largest `k * size + offset` that is `<= ts`.
/// `size` > 0; `offset` may be negative or positive.
#[inline]
pub fn floor_to_lattice(ts: Epoch, size: i64, offset: i64) -> Epoch {
    debug_assert!(size > 0);
    let rel = ts - offset;
    div_floor(rel, size) * size + offset
}

/// Floor division for i64 (unlike `/` which truncates toward zero).
#[inline]
pub(crate) fn div_floor(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if (r != 0) && ((r > 0) != (b > 0)) { q - 1 } else { q }
}

/// One observation routed to a reducer.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub epoch: Epoch,
    pub value: f64,
}

impl Sample {
    #[inline] pub fn new(epoch: Epoch, value: f64) -> Self { Self { epoch, value } }
}

/// Check the ordering invariant shared by window lists: `lo <= hi` and
/// non-decreasing `hi`. Returns the offending index on failure.
pub(crate) fn first_unordered_window(windows: &[EpochWindow]) -> Option<usize> {
    let mut last_hi = Epoch::MIN;
    for (i, w) in windows.iter().enumerate() {
        if w.lo > w.hi || w.hi < last_hi {
            return Some(i);
        }
        last_hi = w.hi;
    }
    None
}

/// Same check for pick targets: non-decreasing.
pub(crate) fn first_unordered_target(targets: &[Epoch]) -> Option<usize> {
    targets.windows(2).position(|w| w[1] < w[0]).map(|i| i + 1)
}
