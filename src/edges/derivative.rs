/// Derivative of `y` with respect to `x` on a strictly increasing axis.
///
/// Interior samples use the central difference `(y[i+1] - y[i-1]) / (x[i+1] - x[i-1])`;
/// the first and last samples use one-sided differences. Fewer than two samples
/// yield zeros.
pub fn derivative(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len().min(y.len());
    let mut out = vec![0.0; n];
    if n < 2 {
        return out;
    }
    out[0] = (y[1] - y[0]) / (x[1] - x[0]);
    out[n - 1] = (y[n - 1] - y[n - 2]) / (x[n - 1] - x[n - 2]);
    for i in 1..n - 1 {
        out[i] = (y[i + 1] - y[i - 1]) / (x[i + 1] - x[i - 1]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_profile_has_constant_slope() {
        let x: Vec<f64> = (0..10).map(|i| 0.5 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 1.0).collect();
        for d in derivative(&x, &y) {
            assert_relative_eq!(d, 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn degenerate_inputs() {
        assert!(derivative(&[], &[]).is_empty());
        assert_eq!(derivative(&[1.0], &[4.0]), vec![0.0]);
    }
}
