//! Small sample-statistics helpers and Student-t lookups.

use statrs::distribution::{ContinuousCDF, StudentsT};
use vscreen_common::{Result, VscreenError};

/// Two-sided 95% confidence level.
const CONFIDENCE_QUANTILE: f64 = 0.975;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Bessel-corrected variance; zero for fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    sample_covariance(values, values)
}

/// Bessel-corrected covariance of two equally long series; zero for fewer
/// than two pairs.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (ma, mb) = (mean(&a[..n]), mean(&b[..n]));
    let sum: f64 = a[..n]
        .iter()
        .zip(&b[..n])
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum();
    sum / (n as f64 - 1.0)
}

fn students_t(df: usize) -> Result<StudentsT> {
    StudentsT::new(0.0, 1.0, df as f64).map_err(|e| VscreenError::Statistics(e.to_string()))
}

/// Critical value for a two-sided 95% interval with `df` degrees of freedom.
pub fn t_critical(df: usize) -> Result<f64> {
    Ok(students_t(df)?.inverse_cdf(CONFIDENCE_QUANTILE))
}

/// Two-sided p-value of `t` under Student's t with `df` degrees of freedom.
pub fn two_sided_p(t: f64, df: usize) -> Result<f64> {
    let dist = students_t(df)?;
    Ok((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}
