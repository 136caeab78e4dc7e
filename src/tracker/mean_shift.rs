//! Mean-shift tracker on a luminance histogram.

use crate::error::TrackerError;
use crate::frame::LumaFrame;
use crate::tracker::algorithm::{TrackUpdate, TrackerAlgorithm};
use crate::tracker::rect::Rect;
use crate::tracker::template_match::PixelBox;

const BINS: usize = 16;
const MAX_ITERATIONS: usize = 20;
const CONVERGED_SHIFT: f64 = 0.5;
const LOST_SIMILARITY: f32 = 0.2;

type Histogram = [f32; BINS];

#[inline]
fn bin_of(luma: f32) -> usize {
    ((luma.clamp(0.0, 255.0) as usize) * BINS / 256).min(BINS - 1)
}

fn histogram(frame: &LumaFrame, pbox: PixelBox) -> Histogram {
    let mut hist = [0.0; BINS];
    let view = pbox.view(frame);
    for &v in view.iter() {
        hist[bin_of(v)] += 1.0;
    }
    let total = view.len() as f32;
    if total > 0.0 {
        hist.iter_mut().for_each(|h| *h /= total);
    }
    hist
}

/// Bhattacharyya coefficient between two normalized histograms.
fn similarity(p: &Histogram, q: &Histogram) -> f32 {
    p.iter().zip(q).map(|(a, b)| (a * b).sqrt()).sum()
}

#[derive(Debug, Clone, Default)]
pub struct MeanShiftTracker {
    model: Option<Histogram>,
    roi: Rect,
}

impl TrackerAlgorithm for MeanShiftTracker {
    fn initialize(&mut self, frame: &LumaFrame, roi: Rect) -> bool {
        self.model = None;
        self.roi = roi;

        match PixelBox::from_rect(roi, frame) {
            Some(pbox) if pbox.width >= 4 && pbox.height >= 4 => {
                self.model = Some(histogram(frame, pbox));
                self.roi = pbox.to_rect();
                true
            }
            _ => false,
        }
    }

    fn update(&mut self, frame: &LumaFrame) -> Result<TrackUpdate, TrackerError> {
        let model = self.model.ok_or(TrackerError::NotInitialized)?;
        let mut roi = self.roi;

        for _ in 0..MAX_ITERATIONS {
            let pbox = PixelBox::from_rect(roi, frame).ok_or(TrackerError::DegenerateRoi)?;
            let candidate = histogram(frame, pbox);

            let mut weight_sum = 0.0f64;
            let mut sx = 0.0f64;
            let mut sy = 0.0f64;
            for ((row, col), &v) in pbox.view(frame).indexed_iter() {
                let b = bin_of(v);
                if candidate[b] <= 0.0 {
                    continue;
                }
                let w = f64::from((model[b] / candidate[b]).sqrt());
                weight_sum += w;
                sx += w * (pbox.col + col) as f64;
                sy += w * (pbox.row + row) as f64;
            }

            if weight_sum <= 0.0 {
                break;
            }

            // pixel centers sit at +0.5
            let (cx, cy) = (sx / weight_sum + 0.5, sy / weight_sum + 0.5);
            let (ox, oy) = roi.center();
            roi = roi.with_center(cx, cy);
            if (cx - ox).hypot(cy - oy) < CONVERGED_SHIFT {
                break;
            }
        }

        let pbox = PixelBox::from_rect(roi, frame).ok_or(TrackerError::DegenerateRoi)?;
        let confidence = similarity(&histogram(frame, pbox), &model).clamp(0.0, 1.0);
        if confidence < LOST_SIMILARITY {
            return Err(TrackerError::TargetLost { confidence });
        }

        self.roi = roi;
        Ok(TrackUpdate { roi, confidence })
    }
}
