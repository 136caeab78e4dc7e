//! Drag-to-draw state for new regions of interest.

use crate::tracker::Rect;

/// A rectangle being drawn by the operator, anchored where the drag began.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoiDraft {
    anchor: Option<(f64, f64)>,
    cursor: (f64, f64),
}

impl RoiDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a drag at `(x, y)`, discarding any unfinished one.
    pub fn begin(&mut self, x: f64, y: f64) {
        self.anchor = Some((x, y));
        self.cursor = (x, y);
    }

    /// Move the free corner. Ignored when no drag is in progress.
    pub fn drag_to(&mut self, x: f64, y: f64) {
        if self.anchor.is_some() {
            self.cursor = (x, y);
        }
    }

    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// Rectangle spanned so far, for the overlay.
    pub fn preview(&self) -> Option<Rect> {
        let (x0, y0) = self.anchor?;
        Some(Rect::from_corners(x0, y0, self.cursor.0, self.cursor.1))
    }

    /// End the drag at `(x, y)`.
    ///
    /// Returns `None` when no drag was active or the rectangle has zero
    /// width or height (a plain click).
    pub fn finish(&mut self, x: f64, y: f64) -> Option<Rect> {
        self.drag_to(x, y);
        let rect = self.preview();
        self.cancel();
        rect.filter(|r| r.width > 0.0 && r.height > 0.0)
    }

    pub fn cancel(&mut self) {
        self.anchor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_down_right() {
        let mut draft = RoiDraft::new();
        draft.begin(10.0, 20.0);
        draft.drag_to(25.0, 30.0);
        assert_eq!(draft.preview(), Some(Rect::new(10.0, 20.0, 15.0, 10.0)));
        assert_eq!(draft.finish(40.0, 50.0), Some(Rect::new(10.0, 20.0, 30.0, 30.0)));
        assert!(!draft.is_active());
    }

    #[test]
    fn test_drag_up_left_is_normalized() {
        let mut draft = RoiDraft::new();
        draft.begin(40.0, 50.0);
        assert_eq!(draft.finish(10.0, 20.0), Some(Rect::new(10.0, 20.0, 30.0, 30.0)));
    }

    #[test]
    fn test_click_without_area_yields_nothing() {
        let mut draft = RoiDraft::new();
        draft.begin(10.0, 10.0);
        assert_eq!(draft.finish(10.0, 40.0), None);
        assert_eq!(draft.finish(50.0, 50.0), None);
    }

    #[test]
    fn test_drag_without_begin_is_ignored() {
        let mut draft = RoiDraft::new();
        draft.drag_to(5.0, 5.0);
        assert_eq!(draft.preview(), None);
    }
}
