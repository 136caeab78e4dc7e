//! Ordered collection of tracked objects.

use tracing::debug;

use crate::tracker::algorithm::TrackerAlgorithm;
use crate::tracker::rect::Rect;
use crate::tracker::tracked_object::TrackedObject;

/// Object removed by [`Registry::remove_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removed {
    /// Index the object had before removal
    pub index: usize,
    pub id: u64,
}

/// Tracked objects in creation order.
///
/// The index of an object is its position in creation order among the
/// objects still alive; chart series are bound to ROIs by this index.
#[derive(Debug, Default)]
pub struct Registry {
    objects: Vec<TrackedObject>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new, uninitialized object and return its index.
    pub fn insert(&mut self, roi: Rect, tracker: Box<dyn TrackerAlgorithm>) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.push(TrackedObject::new(id, roi, tracker));

        let index = self.objects.len() - 1;
        debug!(index, id, ?roi, "roi added");
        index
    }

    /// Remove the first object, in index order, whose ROI contains the point.
    pub fn remove_at(&mut self, x: f64, y: f64) -> Option<Removed> {
        let index = self.objects.iter().position(|o| o.roi.contains(x, y))?;
        let object = self.objects.remove(index);

        debug!(index, id = object.id, x, y, "roi removed");
        Some(Removed {
            index,
            id: object.id,
        })
    }

    pub fn clear(&mut self) {
        if !self.objects.is_empty() {
            debug!(count = self.objects.len(), "all rois removed");
        }
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrackedObject> {
        self.objects.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackedObject> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TrackedObject> {
        self.objects.iter_mut()
    }

    /// Whether any object has already been fed a frame.
    pub fn has_initialized(&self) -> bool {
        self.objects.iter().any(|o| o.initialized)
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a TrackedObject;
    type IntoIter = std::slice::Iter<'a, TrackedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::tracked_object::tests::ScriptedTracker;

    fn tracker() -> Box<dyn TrackerAlgorithm> {
        Box::new(ScriptedTracker::new(true, (0.0, 0.0)))
    }

    #[test]
    fn test_insert_returns_last_index() {
        let mut registry = Registry::new();
        assert_eq!(registry.insert(Rect::new(10.0, 10.0, 20.0, 20.0), tracker()), 0);
        assert_eq!(registry.insert(Rect::new(50.0, 50.0, 20.0, 20.0), tracker()), 1);
        assert_eq!(registry.len(), 2);
        assert!(!registry.get(0).unwrap().initialized);
        assert!(registry.get(1).unwrap().series.is_empty());
    }

    #[test]
    fn test_remove_at_prefers_lower_index() {
        let mut registry = Registry::new();
        registry.insert(Rect::new(0.0, 0.0, 50.0, 50.0), tracker());
        registry.insert(Rect::new(20.0, 20.0, 50.0, 50.0), tracker());

        let removed = registry.remove_at(30.0, 30.0).unwrap();
        assert_eq!(removed, Removed { index: 0, id: 0 });
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0).unwrap().id, 1);
    }

    #[test]
    fn test_remove_at_miss_is_noop() {
        let mut registry = Registry::new();
        registry.insert(Rect::new(0.0, 0.0, 10.0, 10.0), tracker());

        assert_eq!(registry.remove_at(10.0, 5.0), None);
        assert_eq!(registry.remove_at(-1.0, 5.0), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut registry = Registry::new();
        registry.insert(Rect::new(0.0, 0.0, 10.0, 10.0), tracker());
        registry.clear();
        registry.insert(Rect::new(0.0, 0.0, 10.0, 10.0), tracker());
        assert_eq!(registry.get(0).unwrap().id, 1);
    }
}
