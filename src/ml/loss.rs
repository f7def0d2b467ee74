// ============================================================
// Layer 5 — Smoothed Binary Cross-Entropy
// ============================================================
// Both players are trained with BCE on raw discriminator logits
// against a constant soft target: 0.9 for "real" and 0.1 for
// "fake" (one-sided label smoothing on both ends).
//
// For a logit x and target t the per-element loss is
//
//   -(t·ln σ(x) + (1 - t)·ln(1 - σ(x)))
//     = max(x, 0) - x·t + ln(1 + e^(-|x|))
//
// The right-hand form never exponentiates a positive number,
// so it stays finite for large |x|.

use burn::prelude::*;

/// Mean BCE between `logits` and a constant target, shape [1].
pub fn bce_with_logits<B: Backend>(logits: Tensor<B, 1>, target: f32) -> Tensor<B, 1> {
    let positive = logits.clone().clamp_min(0.0);
    let softplus = logits.clone().abs().neg().exp().add_scalar(1.0).log();
    (positive - logits.mul_scalar(target) + softplus).mean()
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn reference(x: f64, t: f64) -> f64 {
        let p = 1.0 / (1.0 + (-x).exp());
        -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
    }

    fn loss(values: &[f32], target: f32) -> f64 {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 1>::from_floats(values, &device);
        bce_with_logits(logits, target).into_scalar().elem::<f64>()
    }

    #[test]
    fn test_zero_logit_is_ln2() {
        assert!((loss(&[0.0, 0.0], 0.9) - std::f64::consts::LN_2).abs() < 1e-6);
        assert!((loss(&[0.0], 0.1) - std::f64::consts::LN_2).abs() < 1e-6);
    }

    #[test]
    fn test_matches_reference_formula() {
        let values = [2.0f32, -1.0, 0.5, -3.0];
        for target in [0.9f32, 0.1] {
            let expected = values
                .iter()
                .map(|&x| reference(x as f64, target as f64))
                .sum::<f64>() / values.len() as f64;
            assert!((loss(&values, target) - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_large_logits_stay_finite() {
        let l = loss(&[80.0, -80.0], 0.9);
        assert!(l.is_finite());
        // 0.1·80 + 0.9·80 = 80 for the two halves, averaged
        assert!((l - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_loss_is_lower_near_target() {
        // a confident "real" logit scores better against 0.9 than 0.1
        assert!(loss(&[3.0], 0.9) < loss(&[3.0], 0.1));
    }
}
