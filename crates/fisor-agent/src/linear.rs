//! Linear function approximators and the feature maps they consume.

use serde::{Deserialize, Serialize};

/// A dense linear map `y = W x` stored row-major (`out_dim × in_dim`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    in_dim: usize,
    out_dim: usize,
    weights: Vec<f32>,
}

impl LinearModel {
    #[must_use]
    pub fn zeros(in_dim: usize, out_dim: usize) -> Self {
        Self {
            in_dim,
            out_dim,
            weights: vec![0.0; in_dim * out_dim],
        }
    }

    #[must_use]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[must_use]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// # Panics
    ///
    /// Panics if `features` does not have `in_dim` entries.
    #[must_use]
    pub fn predict(&self, features: &[f32]) -> Vec<f32> {
        assert_eq!(features.len(), self.in_dim, "feature dimension mismatch");
        self.weights
            .chunks_exact(self.in_dim)
            .map(|row| dot(row, features))
            .collect()
    }

    /// Single-output convenience for value heads.
    #[must_use]
    pub fn predict_scalar(&self, features: &[f32]) -> f32 {
        debug_assert_eq!(self.out_dim, 1);
        dot(&self.weights[..self.in_dim], features)
    }

    /// Applies `W ← W - lr · G` for an accumulated gradient `G`.
    ///
    /// # Panics
    ///
    /// Panics if `gradient` has a different shape.
    pub fn apply_gradient(&mut self, gradient: &Gradient, lr: f32) {
        assert_eq!(gradient.values.len(), self.weights.len(), "gradient shape mismatch");
        for (w, g) in self.weights.iter_mut().zip(&gradient.values) {
            *w -= lr * g;
        }
    }
}

/// Gradient accumulator matching a [`LinearModel`].
#[derive(Debug, Clone)]
pub struct Gradient {
    in_dim: usize,
    values: Vec<f32>,
}

impl Gradient {
    #[must_use]
    pub fn for_model(model: &LinearModel) -> Self {
        Self {
            in_dim: model.in_dim,
            values: vec![0.0; model.weights.len()],
        }
    }

    /// Adds `d_out ⊗ features`, the gradient of `d_out · (W x)` with respect to `W`.
    pub fn accumulate(&mut self, d_out: &[f32], features: &[f32]) {
        for (row, d) in self.values.chunks_exact_mut(self.in_dim).zip(d_out) {
            for (g, x) in row.iter_mut().zip(features) {
                *g += d * x;
            }
        }
    }

    pub fn scale(&mut self, factor: f32) {
        for g in &mut self.values {
            *g *= factor;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `[s, 1]`
#[must_use]
pub fn state_features(observation: &[f32]) -> Vec<f32> {
    let mut features = Vec::with_capacity(observation.len() + 1);
    features.extend_from_slice(observation);
    features.push(1.0);
    features
}

/// `[s, a, a², 1]`; the squared action terms let a linear critic peak inside
/// the action box.
#[must_use]
pub fn state_action_features(observation: &[f32], action: &[f32]) -> Vec<f32> {
    let mut features = Vec::with_capacity(observation.len() + 2 * action.len() + 1);
    features.extend_from_slice(observation);
    features.extend_from_slice(action);
    features.extend(action.iter().map(|a| a * a));
    features.push(1.0);
    features
}

#[must_use]
pub fn state_feature_dim(observation_dim: usize) -> usize {
    observation_dim + 1
}

#[must_use]
pub fn state_action_feature_dim(observation_dim: usize, action_dim: usize) -> usize {
    observation_dim + 2 * action_dim + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_dims() {
        assert_eq!(state_features(&[1.0, 2.0]).len(), state_feature_dim(2));
        assert_eq!(
            state_action_features(&[1.0, 2.0], &[0.5]),
            vec![1.0, 2.0, 0.5, 0.25, 1.0]
        );
        assert_eq!(state_action_feature_dim(2, 1), 5);
    }

    #[test]
    fn test_gradient_descent_fits_linear_target() {
        // y = 2x - 1
        let mut model = LinearModel::zeros(2, 1);
        for _ in 0..2000 {
            let mut grad = Gradient::for_model(&model);
            for x in [-1.0_f32, 0.0, 0.5, 1.0] {
                let features = state_features(&[x]);
                let err = model.predict_scalar(&features) - (2.0 * x - 1.0);
                grad.accumulate(&[err], &features);
            }
            grad.scale(0.25);
            model.apply_gradient(&grad, 0.1);
        }
        assert!((model.weights()[0] - 2.0).abs() < 1e-3);
        assert!((model.weights()[1] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_multi_output_predict() {
        let mut model = LinearModel::zeros(2, 2);
        let mut grad = Gradient::for_model(&model);
        grad.accumulate(&[-1.0, -2.0], &[1.0, 0.0]);
        model.apply_gradient(&grad, 1.0);
        assert_eq!(model.predict(&[3.0, 5.0]), vec![3.0, 6.0]);
    }
}
