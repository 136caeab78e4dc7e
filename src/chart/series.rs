//! Bounded per-object time series.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One `(time, value)` point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

/// Time-ordered samples of one coordinate; oldest at the front.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    samples: VecDeque<Sample>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> + ExactSizeIterator {
        self.samples.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// `(min, max)` over times, or `None` when empty.
    pub fn time_bounds(&self) -> Option<(f64, f64)> {
        bounds(self.samples.iter().map(|s| s.time))
    }

    /// `(min, max)` over values, or `None` when empty.
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        bounds(self.samples.iter().map(|s| s.value))
    }

    fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
    }

    fn pop_front(&mut self) {
        self.samples.pop_front();
    }

    fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Single pass running min/max. Non-finite values are skipped so a stray
/// NaN never reaches an axis range.
pub(crate) fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// The X and Y series of one tracked object.
///
/// Both series are only ever mutated together, so they always hold the
/// same number of samples with identical times.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesPair {
    x: TimeSeries,
    y: TimeSeries,
}

impl SeriesPair {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `(t, x)` and `(t, y)`, then drop the oldest samples until at
    /// most `capacity` remain.
    ///
    /// A capacity of zero is treated as one; the newest sample is always kept.
    pub fn push(&mut self, time: f64, x: f64, y: f64, capacity: usize) {
        self.x.push(Sample { time, value: x });
        self.y.push(Sample { time, value: y });

        let capacity = capacity.max(1);
        while self.x.len() > capacity {
            self.x.pop_front();
            self.y.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &TimeSeries {
        &self.x
    }

    pub fn y(&self) -> &TimeSeries {
        &self.y
    }

    /// Iterate `(time, x, y)` triples, oldest first.
    pub fn triples(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.x
            .iter()
            .zip(self.y.iter())
            .map(|(sx, sy)| (sx.time, sx.value, sy.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_keeps_most_recent() {
        let mut pair = SeriesPair::new();
        for (t, v) in [(0.0, 10.0), (1.0, 11.0), (2.0, 12.0), (3.0, 13.0)] {
            pair.push(t, v, -v, 3);
        }

        let kept: Vec<(f64, f64)> = pair.x().iter().map(|s| (s.time, s.value)).collect();
        assert_eq!(kept, vec![(1.0, 11.0), (2.0, 12.0), (3.0, 13.0)]);
        assert_eq!(pair.x().len(), pair.y().len());
    }

    #[test]
    fn test_sizes_stay_equal_under_any_capacity() {
        for capacity in 1..8 {
            let mut pair = SeriesPair::new();
            for i in 0..20 {
                pair.push(i as f64, i as f64, i as f64 * 2.0, capacity);
                assert_eq!(pair.x().len(), pair.y().len());
                assert!(pair.len() <= capacity);
            }
            let first = pair.x().get(0).unwrap().time;
            assert_eq!(first, (20 - capacity) as f64);
        }
    }

    #[test]
    fn test_capacity_shrink_applies_on_next_push() {
        let mut pair = SeriesPair::new();
        for i in 0..10 {
            pair.push(i as f64, 0.0, 0.0, 10);
        }
        assert_eq!(pair.len(), 10);

        pair.push(10.0, 0.0, 0.0, 4);
        assert_eq!(pair.len(), 4);
        assert_eq!(pair.x().get(0).unwrap().time, 7.0);
    }

    #[test]
    fn test_zero_capacity_keeps_newest() {
        let mut pair = SeriesPair::new();
        pair.push(0.0, 1.0, 2.0, 0);
        pair.push(1.0, 3.0, 4.0, 0);
        assert_eq!(pair.triples().collect::<Vec<_>>(), vec![(1.0, 3.0, 4.0)]);
    }

    #[test]
    fn test_clear_empties_both() {
        let mut pair = SeriesPair::new();
        pair.push(0.0, 1.0, 2.0, 5);
        pair.clear();
        assert!(pair.x().is_empty() && pair.y().is_empty());
    }

    #[test]
    fn test_bounds_skip_non_finite() {
        assert_eq!(bounds([3.0, f64::NAN, -1.0, 2.0].into_iter()), Some((-1.0, 3.0)));
        assert_eq!(bounds(std::iter::empty()), None);
    }
}
