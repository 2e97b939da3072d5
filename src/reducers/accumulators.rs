//! Per-slot accumulators for the windowed reducer kinds.

use super::ReducerKind;

/// State of one open window slot.
///
/// `value` is `None` while nothing was folded; the slot then keeps its
/// [`ReducerKind::empty_value`].
pub trait SlotAccumulator: Default + Send + 'static {
    const KIND: ReducerKind;

    fn fold(&mut self, v: f64);

    fn value(&self) -> Option<f64>;

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/* ===================== Sum ===================== */

/// Running sum.
///
/// - Accumulator: `(f64, bool)`
/// - Empty: `NaN`
#[derive(Clone, Copy, Debug, Default)]
pub struct Sum {
    sum: f64,
    seen: bool,
}

impl SlotAccumulator for Sum {
    const KIND: ReducerKind = ReducerKind::Sum;

    fn fold(&mut self, v: f64) {
        self.sum += v;
        self.seen = true;
    }

    fn value(&self) -> Option<f64> {
        self.seen.then_some(self.sum)
    }
}

/* ===================== Count ===================== */

/// Number of samples.
///
/// - Accumulator: `u64`
/// - Empty: `0`
#[derive(Clone, Copy, Debug, Default)]
pub struct Count(u64);

impl SlotAccumulator for Count {
    const KIND: ReducerKind = ReducerKind::Count;

    fn fold(&mut self, _v: f64) {
        self.0 += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.0 > 0).then_some(self.0 as f64)
    }
}

/* ===================== Mean ===================== */

/// Arithmetic mean, `sum / count`.
///
/// - Accumulator: `(f64, u64)`
/// - Empty: `NaN`
#[derive(Clone, Copy, Debug, Default)]
pub struct Mean {
    sum: f64,
    n: u64,
}

impl SlotAccumulator for Mean {
    const KIND: ReducerKind = ReducerKind::Mean;

    fn fold(&mut self, v: f64) {
        self.sum += v;
        self.n += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

/* ===================== Min / Max ===================== */

/// Smallest sample.
///
/// - Accumulator: `Option<f64>`
/// - Empty: `NaN`
#[derive(Clone, Copy, Debug, Default)]
pub struct Min(Option<f64>);

impl SlotAccumulator for Min {
    const KIND: ReducerKind = ReducerKind::Min;

    fn fold(&mut self, v: f64) {
        match self.0 {
            Some(cur) if cur <= v => {}
            _ => self.0 = Some(v),
        }
    }

    fn value(&self) -> Option<f64> {
        self.0
    }
}

/// Largest sample.
///
/// - Accumulator: `Option<f64>`
/// - Empty: `NaN`
#[derive(Clone, Copy, Debug, Default)]
pub struct Max(Option<f64>);

impl SlotAccumulator for Max {
    const KIND: ReducerKind = ReducerKind::Max;

    fn fold(&mut self, v: f64) {
        match self.0 {
            Some(cur) if cur >= v => {}
            _ => self.0 = Some(v),
        }
    }

    fn value(&self) -> Option<f64> {
        self.0
    }
}

/* ===================== First / Last ===================== */

/// Earliest sample in the slot; later ones are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct First(Option<f64>);

impl SlotAccumulator for First {
    const KIND: ReducerKind = ReducerKind::First;

    fn fold(&mut self, v: f64) {
        self.0.get_or_insert(v);
    }

    fn value(&self) -> Option<f64> {
        self.0
    }
}

/// Latest sample in the slot.
#[derive(Clone, Copy, Debug, Default)]
pub struct Last(Option<f64>);

impl SlotAccumulator for Last {
    const KIND: ReducerKind = ReducerKind::Last;

    fn fold(&mut self, v: f64) {
        self.0 = Some(v);
    }

    fn value(&self) -> Option<f64> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folded<A: SlotAccumulator>(values: &[f64]) -> Option<f64> {
        let mut acc = A::default();
        values.iter().for_each(|&v| acc.fold(v));
        acc.value()
    }

    #[test]
    fn accumulators_fold_a_slot() {
        let xs = [4.0, -1.0, 7.5, 2.0];
        assert_eq!(folded::<Sum>(&xs), Some(12.5));
        assert_eq!(folded::<Count>(&xs), Some(4.0));
        assert_eq!(folded::<Mean>(&xs), Some(3.125));
        assert_eq!(folded::<Min>(&xs), Some(-1.0));
        assert_eq!(folded::<Max>(&xs), Some(7.5));
        assert_eq!(folded::<First>(&xs), Some(4.0));
        assert_eq!(folded::<Last>(&xs), Some(2.0));
    }

    #[test]
    fn empty_accumulators_have_no_value() {
        assert_eq!(folded::<Sum>(&[]), None);
        assert_eq!(folded::<Count>(&[]), None);
        assert_eq!(folded::<Min>(&[]), None);
    }

    #[test]
    fn min_max_accept_infinities() {
        let xs = [f64::INFINITY, f64::NEG_INFINITY];
        assert_eq!(folded::<Min>(&xs), Some(f64::NEG_INFINITY));
        assert_eq!(folded::<Max>(&xs), Some(f64::INFINITY));
    }

    #[test]
    fn reset_clears_state() {
        let mut acc = Mean::default();
        acc.fold(3.0);
        acc.reset();
        assert_eq!(acc.value(), None);
    }
}
