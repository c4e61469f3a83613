//! Cross-entropy loss over class logits

use crate::{Error, Result};
use ndarray::{Array2, Axis};

/// Softmax cross-entropy with integer class labels.
///
/// `L = mean_n(-log softmax(logits_n)[label_n])`
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Row-wise softmax, shifted by the row max for stability
    pub fn softmax(logits: &Array2<f32>) -> Array2<f32> {
        let mut probs = logits.clone();
        for mut row in probs.axis_iter_mut(Axis(0)) {
            let max = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
        probs
    }

    /// Mean loss and its gradient with respect to `logits`.
    ///
    /// The gradient is `(softmax - onehot) / N`.
    pub fn forward(&self, logits: &Array2<f32>, labels: &[usize]) -> Result<(f32, Array2<f32>)> {
        let (n, classes) = logits.dim();
        if n != labels.len() {
            return Err(Error::shape_mismatch("cross-entropy labels", n, labels.len()));
        }
        if n == 0 {
            return Err(Error::EmptyDataset("cross-entropy over an empty batch".to_string()));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= classes) {
            return Err(Error::shape_mismatch(
                "cross-entropy label",
                format!("< {classes}"),
                bad,
            ));
        }

        let mut grad = Self::softmax(logits);
        let mut total = 0.0f32;
        for (mut row, &label) in grad.axis_iter_mut(Axis(0)).zip(labels) {
            total -= row[label].max(f32::MIN_POSITIVE).ln();
            row[label] -= 1.0;
        }
        grad /= n as f32;

        let loss = total / n as f32;
        if !loss.is_finite() {
            return Err(Error::NumericalInstability {
                method: "cross-entropy".to_string(),
                details: format!("loss is {loss}"),
            });
        }
        Ok((loss, grad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let probs = CrossEntropyLoss::softmax(&array![[1.0, 2.0, 3.0], [1000.0, 1000.0, 0.0]]);
        for row in probs.axis_iter(Axis(0)) {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(probs[[1, 0]], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_uniform_logits_loss_is_log_classes() {
        let (loss, _) = CrossEntropyLoss
            .forward(&Array2::zeros((4, 10)), &[0, 3, 5, 9])
            .unwrap();
        assert_abs_diff_eq!(loss, 10.0f32.ln(), epsilon = 1e-5);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let logits = array![[0.2, -0.4, 1.1], [0.5, 0.0, -1.0]];
        let labels = [2, 0];
        let (_, grad) = CrossEntropyLoss.forward(&logits, &labels).unwrap();

        let eps = 1e-3;
        for ((i, j), &g) in grad.indexed_iter() {
            let mut plus = logits.clone();
            plus[[i, j]] += eps;
            let mut minus = logits.clone();
            minus[[i, j]] -= eps;
            let (lp, _) = CrossEntropyLoss.forward(&plus, &labels).unwrap();
            let (lm, _) = CrossEntropyLoss.forward(&minus, &labels).unwrap();
            assert_abs_diff_eq!(g, (lp - lm) / (2.0 * eps), epsilon = 1e-3);
        }
    }

    #[test]
    fn test_gradient_rows_sum_to_zero() {
        let (_, grad) = CrossEntropyLoss
            .forward(&array![[3.0, 1.0], [-2.0, 0.5]], &[1, 1])
            .unwrap();
        for row in grad.axis_iter(Axis(0)) {
            assert_abs_diff_eq!(row.sum(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_label_out_of_range() {
        let err = CrossEntropyLoss
            .forward(&Array2::zeros((1, 3)), &[3])
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_label_count_mismatch() {
        assert!(CrossEntropyLoss
            .forward(&Array2::zeros((2, 3)), &[0])
            .is_err());
    }
}
