//! Class-balanced logistic regression by batch gradient descent.
//!
//! Features are standardized for the descent and the weights folded back
//! into raw feature space, so the artifact applies directly to
//! unscaled inputs.

use super::Penalty;
use crate::prediction::model::{sigmoid, LogisticClassifier};

const LEARNING_RATE: f64 = 0.5;
const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct LogisticParams {
    pub penalty: Penalty,
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
}

pub fn fit_logistic(x: &[Vec<f64>], y: &[u8], params: &LogisticParams) -> LogisticClassifier {
    let n = x.len();
    let width = x.first().map_or(0, Vec::len);
    if n == 0 {
        return LogisticClassifier {
            coefficients: vec![0.0; width],
            intercept: 0.0,
        };
    }

    let (means, scales) = column_stats(x, width);
    let z: Vec<Vec<f64>> = x
        .iter()
        .map(|row| {
            row.iter()
                .zip(means.iter().zip(&scales))
                .map(|(v, (m, s))| (v - m) / s)
                .collect()
        })
        .collect();

    let sample_weights = balanced_weights(y);
    let total_weight: f64 = sample_weights.iter().sum();
    let alpha = match params.penalty {
        Penalty::L2 if params.c > 0.0 => 1.0 / (params.c * total_weight),
        _ => 0.0,
    };

    let mut w = vec![0.0; width];
    let mut b = 0.0;
    let mut grad_w = vec![0.0; width];

    for iteration in 0..params.max_iter {
        grad_w.iter_mut().for_each(|g| *g = 0.0);
        let mut grad_b = 0.0;

        for ((row, &label), &sw) in z.iter().zip(y).zip(&sample_weights) {
            let margin: f64 = row.iter().zip(&w).map(|(v, wi)| v * wi).sum::<f64>() + b;
            let err = sw * (sigmoid(margin) - f64::from(label));
            for (g, v) in grad_w.iter_mut().zip(row) {
                *g += err * v;
            }
            grad_b += err;
        }

        let mut largest = (grad_b / total_weight).abs();
        for (g, wi) in grad_w.iter_mut().zip(&w) {
            *g = *g / total_weight + alpha * wi;
            largest = largest.max(g.abs());
        }

        for (wi, g) in w.iter_mut().zip(&grad_w) {
            *wi -= LEARNING_RATE * g;
        }
        b -= LEARNING_RATE * grad_b / total_weight;

        if largest < TOLERANCE {
            tracing::debug!(iteration, "Logistic regression converged");
            break;
        }
    }

    let coefficients: Vec<f64> = w.iter().zip(&scales).map(|(wi, s)| wi / s).collect();
    let intercept = b - w
        .iter()
        .zip(means.iter().zip(&scales))
        .map(|(wi, (m, s))| wi * m / s)
        .sum::<f64>();

    LogisticClassifier {
        coefficients,
        intercept,
    }
}

/// Per-column mean and standard deviation; constant columns scale by 1.
fn column_stats(x: &[Vec<f64>], width: usize) -> (Vec<f64>, Vec<f64>) {
    let n = x.len() as f64;
    let mut means = vec![0.0; width];
    for row in x {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v / n;
        }
    }
    let mut scales = vec![0.0; width];
    for row in x {
        for ((s, v), m) in scales.iter_mut().zip(row).zip(&means) {
            *s += (v - m).powi(2) / n;
        }
    }
    for s in scales.iter_mut() {
        *s = s.sqrt();
        if *s < 1e-12 {
            *s = 1.0;
        }
    }
    (means, scales)
}

/// `n_samples / (n_classes * class_count)` per sample.
fn balanced_weights(y: &[u8]) -> Vec<f64> {
    let n = y.len() as f64;
    let positives = y.iter().filter(|&&l| l == 1).count() as f64;
    let negatives = n - positives;
    let classes = f64::from(u8::from(positives > 0.0) + u8::from(negatives > 0.0));
    y.iter()
        .map(|&l| {
            let count = if l == 1 { positives } else { negatives };
            n / (classes * count)
        })
        .collect()
}
