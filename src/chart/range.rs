//! Axis ranges for the external chart renderer.

use serde::{Deserialize, Serialize};

use crate::chart::series::{SeriesPair, bounds};

/// Which coordinate series take part in the value-axis range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesVisibility {
    pub x: bool,
    pub y: bool,
}

impl Default for SeriesVisibility {
    fn default() -> Self {
        Self { x: true, y: true }
    }
}

impl SeriesVisibility {
    pub fn any(&self) -> bool {
        self.x || self.y
    }
}

/// Bounds of the chart axes: time horizontally, position vertically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartRange {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ChartRange {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    fn is_finite(&self) -> bool {
        [self.x_min, self.x_max, self.y_min, self.y_max]
            .iter()
            .all(|v| v.is_finite())
    }

    /// `n` evenly spaced labels from `x_min` to `x_max` inclusive.
    pub fn x_ticks(&self, n: usize) -> Vec<f64> {
        linspace(self.x_min, self.x_max, n)
    }

    /// `n` evenly spaced labels from `y_min` to `y_max` inclusive.
    pub fn y_ticks(&self, n: usize) -> Vec<f64> {
        linspace(self.y_min, self.y_max, n)
    }
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Combined range over every object's series.
///
/// The time axis spans all samples of all objects; the value axis spans the
/// union of the visible coordinate series. Returns `None` when there is
/// nothing to measure (no objects, no samples, or no visible series).
pub fn aggregate<'a>(
    objects: impl IntoIterator<Item = &'a SeriesPair>,
    visibility: SeriesVisibility,
) -> Option<ChartRange> {
    if !visibility.any() {
        return None;
    }

    let mut x: Option<(f64, f64)> = None;
    let mut y: Option<(f64, f64)> = None;

    for pair in objects {
        x = merge(x, pair.x().time_bounds());

        if visibility.x {
            y = merge(y, pair.x().value_bounds());
        }
        if visibility.y {
            y = merge(y, pair.y().value_bounds());
        }
    }

    let ((x_min, x_max), (y_min, y_max)) = (x?, y?);
    Some(ChartRange {
        x_min,
        x_max,
        y_min,
        y_max,
    })
}

fn merge(acc: Option<(f64, f64)>, next: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (acc, next) {
        (Some((lo, hi)), Some((a, b))) => bounds([lo, hi, a, b].into_iter()),
        (acc, None) => acc,
        (None, next) => next,
    }
}

/// Keeps the last good global range plus a zoomable view of it.
///
/// An update over empty data leaves both ranges untouched, so consumers never
/// receive an undefined range once one has been established.
#[derive(Debug, Clone, Default)]
pub struct RangeAggregator {
    visibility: SeriesVisibility,
    global: Option<ChartRange>,
    view: Option<ChartRange>,
}

impl RangeAggregator {
    pub fn new(visibility: SeriesVisibility) -> Self {
        Self {
            visibility,
            global: None,
            view: None,
        }
    }

    pub fn visibility(&self) -> SeriesVisibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: SeriesVisibility) {
        self.visibility = visibility;
    }

    /// Recompute the global range. A successful update also resets the view
    /// to the new global range.
    pub fn update<'a>(
        &mut self,
        objects: impl IntoIterator<Item = &'a SeriesPair>,
    ) -> Option<ChartRange> {
        if let Some(range) = aggregate(objects, self.visibility) {
            self.global = Some(range);
            self.view = Some(range);
        }
        self.global
    }

    pub fn global(&self) -> Option<ChartRange> {
        self.global
    }

    /// Range currently shown: the zoomed view if any, else the global range.
    pub fn view(&self) -> Option<ChartRange> {
        self.view.or(self.global)
    }

    /// Show only `range`. Inverted or non-finite ranges are ignored.
    pub fn zoom(&mut self, range: ChartRange) -> bool {
        if !range.is_finite() || range.x_min >= range.x_max || range.y_min >= range.y_max {
            return false;
        }
        self.view = Some(range);
        true
    }

    pub fn reset_zoom(&mut self) {
        self.view = self.global;
    }

    /// Forget all ranges, e.g. when the registry is cleared.
    pub fn reset(&mut self) {
        self.global = None;
        self.view = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(samples: &[(f64, f64, f64)]) -> SeriesPair {
        let mut pair = SeriesPair::new();
        for &(t, x, y) in samples {
            pair.push(t, x, y, 100);
        }
        pair
    }

    #[test]
    fn test_union_over_objects() {
        let a = pair(&[(0.0, 1.0, 1.0), (5.0, 2.0, 2.0)]);
        let b = pair(&[(2.0, 3.0, 3.0), (8.0, 4.0, 4.0)]);

        let range = aggregate([&a, &b], SeriesVisibility::default()).unwrap();
        assert_eq!(range.x_min, 0.0);
        assert_eq!(range.x_max, 8.0);
    }

    #[test]
    fn test_value_axis_follows_visibility() {
        let a = pair(&[(0.0, 10.0, -5.0), (1.0, 20.0, -1.0)]);

        let only_x = aggregate([&a], SeriesVisibility { x: true, y: false }).unwrap();
        assert_eq!((only_x.y_min, only_x.y_max), (10.0, 20.0));

        let only_y = aggregate([&a], SeriesVisibility { x: false, y: true }).unwrap();
        assert_eq!((only_y.y_min, only_y.y_max), (-5.0, -1.0));

        let both = aggregate([&a], SeriesVisibility::default()).unwrap();
        assert_eq!((both.y_min, both.y_max), (-5.0, 20.0));

        assert_eq!(aggregate([&a], SeriesVisibility { x: false, y: false }), None);
    }

    #[test]
    fn test_empty_update_keeps_previous() {
        let mut agg = RangeAggregator::default();
        assert_eq!(agg.update(std::iter::empty()), None);

        let a = pair(&[(0.0, 1.0, 2.0), (1.0, 3.0, 4.0)]);
        let first = agg.update([&a]).unwrap();

        let empty = SeriesPair::new();
        assert_eq!(agg.update([&empty]), Some(first));
        assert_eq!(agg.update(std::iter::empty()), Some(first));
    }

    #[test]
    fn test_zoom_and_reset() {
        let mut agg = RangeAggregator::default();
        let a = pair(&[(0.0, 0.0, 0.0), (10.0, 10.0, 10.0)]);
        let global = agg.update([&a]).unwrap();

        let zoomed = ChartRange {
            x_min: 2.0,
            x_max: 4.0,
            y_min: 1.0,
            y_max: 3.0,
        };
        assert!(agg.zoom(zoomed));
        assert_eq!(agg.view(), Some(zoomed));

        assert!(!agg.zoom(ChartRange {
            x_min: 4.0,
            x_max: 2.0,
            ..zoomed
        }));

        agg.reset_zoom();
        assert_eq!(agg.view(), Some(global));
    }

    #[test]
    fn test_ticks() {
        let range = ChartRange {
            x_min: 0.0,
            x_max: 1.0,
            y_min: -2.0,
            y_max: 2.0,
        };
        assert_eq!(range.x_ticks(5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(range.y_ticks(3), vec![-2.0, 0.0, 2.0]);
        assert!(range.x_ticks(0).is_empty());
    }
}
