//! Descriptive statistics shared by the detectors and the sentinel.
//!
//! All functions are total: empty or too-short inputs yield 0 instead of
//! NaN, so callers can feed them raw batches without pre-checks. Variances
//! are population variances.

/// Guard added to denominators that may be zero.
pub const EPSILON: f64 = 1e-10;

/// Arithmetic mean, 0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance, 0 with fewer than 2 values.
#[must_use]
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Mean absolute deviation from the mean.
#[must_use]
pub fn mean_absolute_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).abs()).sum::<f64>() / values.len() as f64
}

/// Difference between the largest and smallest value.
#[must_use]
pub fn range(values: &[f64]) -> f64 {
    match min_max(values) {
        Some((min, max)) => max - min,
        None => 0.0,
    }
}

/// Smallest and largest value, `None` for an empty slice.
#[must_use]
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

/// Standard deviation over the absolute mean, 0 when the mean is 0.
#[must_use]
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values).abs();
    if m == 0.0 {
        0.0
    } else {
        std_dev(values) / m
    }
}

/// Pearson correlation coefficient.
///
/// Returns 0 when the slices differ in length, hold fewer than 2 points,
/// or either side has zero variance.
#[must_use]
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }
    let mx = mean(xs);
    let my = mean(ys);

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }

    if vx == 0.0 || vy == 0.0 {
        return 0.0;
    }
    cov / (vx.sqrt() * vy.sqrt())
}

/// Lag-1 autocorrelation: Pearson of `values[..n-1]` against `values[1..]`.
#[must_use]
pub fn lag_one_autocorrelation(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    pearson(&values[..values.len() - 1], &values[1..])
}

/// Least-squares slope of `values` against their index.
#[must_use]
pub fn least_squares_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let mx = mean(&xs);
    let my = mean(values);

    let (num, den) = xs
        .iter()
        .zip(values)
        .fold((0.0, 0.0), |(num, den), (x, y)| {
            (num + (x - mx) * (y - my), den + (x - mx).powi(2))
        });

    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_empty_inputs_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(std_dev(&[1.0]), 0.0);
        assert_eq!(range(&[]), 0.0);
        assert_eq!(mean_absolute_deviation(&[]), 0.0);
        assert_eq!(least_squares_slope(&[3.0]), 0.0);
        assert!(min_max(&[]).is_none());
    }

    #[test]
    fn test_population_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < TOL);
        assert!((variance(&values) - 4.0).abs() < TOL);
        assert!((std_dev(&values) - 2.0).abs() < TOL);
    }

    #[test]
    fn test_range_and_mad() {
        let values = [0.2, 0.8, 0.5];
        assert!((range(&values) - 0.6).abs() < TOL);
        assert!((mean_absolute_deviation(&values) - 0.2).abs() < TOL);
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(coefficient_of_variation(&[-1.0, 1.0]), 0.0);
        assert!((coefficient_of_variation(&[1.0, 3.0]) - 0.5).abs() < TOL);
    }

    #[test]
    fn test_pearson() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < TOL);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < TOL);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(pearson(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_lag_one_autocorrelation() {
        let rising = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        assert!((lag_one_autocorrelation(&rising) - 1.0).abs() < 1e-9);

        let alternating = [0.2, 0.8, 0.2, 0.8, 0.2, 0.8];
        assert!((lag_one_autocorrelation(&alternating) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_least_squares_slope() {
        assert!((least_squares_slope(&[1.0, 3.0, 5.0, 7.0]) - 2.0).abs() < TOL);
        assert!(least_squares_slope(&[4.0, 4.0, 4.0]).abs() < TOL);
        assert!(least_squares_slope(&[1.0, 0.0]) < 0.0);
    }
}
