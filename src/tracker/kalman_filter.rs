//! Constant-velocity Kalman filter over an ROI in XYAH form, using ndarray
//! for the state algebra and nalgebra for the 4x4 inverse.

use ndarray::{Array1, Array2};

use crate::tracker::rect::Rect;

/// Filter state: 8-dim mean `(cx, cy, a, h, vcx, vcy, va, vh)` and its covariance.
#[derive(Debug, Clone)]
pub struct KalmanState {
    pub mean: Array1<f64>,
    pub covariance: Array2<f64>,
}

impl KalmanState {
    /// Current ROI estimate.
    pub fn rect(&self) -> Rect {
        Rect::from_xyah(self.mean[0], self.mean[1], self.mean[2], self.mean[3])
    }
}

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(1.0 / 20.0, 1.0 / 160.0)
    }
}

impl KalmanFilter {
    pub fn new(std_weight_position: f64, std_weight_velocity: f64) -> Self {
        let ndim = 4;
        let mut motion_mat = Array2::eye(2 * ndim);
        for i in 0..ndim {
            motion_mat[[i, ndim + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((ndim, 2 * ndim));
        for i in 0..ndim {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position,
            std_weight_velocity,
        }
    }

    /// Start a track at `roi` with zero velocity.
    pub fn initiate(&self, roi: Rect) -> KalmanState {
        let measurement = roi.to_xyah();
        let mut mean = Array1::zeros(8);
        for i in 0..4 {
            mean[i] = measurement[i];
        }

        let h = measurement[3];
        let std = [
            2.0 * self.std_weight_position * h,
            2.0 * self.std_weight_position * h,
            1e-2,
            2.0 * self.std_weight_position * h,
            10.0 * self.std_weight_velocity * h,
            10.0 * self.std_weight_velocity * h,
            1e-5,
            10.0 * self.std_weight_velocity * h,
        ];

        KalmanState {
            mean,
            covariance: diagonal_sq(&std),
        }
    }

    pub fn predict(&self, state: &KalmanState) -> KalmanState {
        let h = state.mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-2,
            self.std_weight_position * h,
            self.std_weight_velocity * h,
            self.std_weight_velocity * h,
            1e-5,
            self.std_weight_velocity * h,
        ];

        let mean = self.motion_mat.dot(&state.mean);
        let covariance = self
            .motion_mat
            .dot(&state.covariance)
            .dot(&self.motion_mat.t())
            + diagonal_sq(&std);

        KalmanState { mean, covariance }
    }

    fn project(&self, state: &KalmanState, measurement_noise: f64) -> (Array1<f64>, Array2<f64>) {
        let h = state.mean[3];
        let std = [
            measurement_noise * self.std_weight_position * h,
            measurement_noise * self.std_weight_position * h,
            1e-1,
            measurement_noise * self.std_weight_position * h,
        ];

        let mean_proj = self.update_mat.dot(&state.mean);
        let covariance_proj = self
            .update_mat
            .dot(&state.covariance)
            .dot(&self.update_mat.t())
            + diagonal_sq(&std);

        (mean_proj, covariance_proj)
    }

    /// Correct `state` with a measured ROI.
    ///
    /// `measurement_noise` scales the measurement standard deviation; values
    /// above 1 make the filter trust the prediction more. Returns `None` if
    /// the innovation covariance is singular.
    pub fn update(
        &self,
        state: &KalmanState,
        measured: Rect,
        measurement_noise: f64,
    ) -> Option<KalmanState> {
        let (projected_mean, projected_cov) = self.project(state, measurement_noise);

        let innovation = Array1::from_vec(measured.to_xyah().to_vec()) - projected_mean;

        // K = P * H^T * S^-1; H = [I 0] so P * H^T is the first 4 columns of P.
        let s_inv = invert_4x4(&projected_cov)?;
        let pht = state.covariance.dot(&self.update_mat.t());
        let kalman_gain = pht.dot(&s_inv);

        let mean = &state.mean + &kalman_gain.dot(&innovation);
        let covariance =
            &state.covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());

        Some(KalmanState { mean, covariance })
    }
}

fn diagonal_sq(std: &[f64]) -> Array2<f64> {
    let mut m = Array2::zeros((std.len(), std.len()));
    for (i, s) in std.iter().enumerate() {
        m[[i, i]] = s * s;
    }
    m
}

fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let nm = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]);
    let inv = nm.try_inverse()?;
    Some(Array2::from_shape_fn((4, 4), |(i, j)| inv[(i, j)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiate() {
        let kf = KalmanFilter::default();
        let state = kf.initiate(Rect::new(90.0, 175.0, 20.0, 50.0));
        assert_eq!(state.mean[0], 100.0);
        assert_eq!(state.mean[1], 200.0);
        assert_eq!(state.mean[4], 0.0);
    }

    #[test]
    fn test_update_pulls_towards_measurement() {
        let kf = KalmanFilter::default();
        let state = kf.predict(&kf.initiate(Rect::new(0.0, 0.0, 20.0, 20.0)));
        let corrected = kf
            .update(&state, Rect::new(10.0, 0.0, 20.0, 20.0), 1.0)
            .unwrap();

        let (cx, _) = corrected.rect().center();
        assert!(cx > 10.0 && cx < 20.0);
    }

    #[test]
    fn test_velocity_is_learned() {
        let kf = KalmanFilter::default();
        let mut state = kf.initiate(Rect::new(0.0, 0.0, 20.0, 20.0));
        for step in 1..=10 {
            state = kf.predict(&state);
            state = kf
                .update(&state, Rect::new(5.0 * step as f64, 0.0, 20.0, 20.0), 1.0)
                .unwrap();
        }
        assert!(state.mean[4] > 1.0);
    }
}
