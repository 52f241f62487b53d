//! Simple ordinary least-squares fit of `y = slope * x + intercept`.

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::PartitionError;

// Keeps the t statistic finite when |r| == 1.
const TINY: f64 = 1.0e-20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionResult {
  pub slope:            f64,
  pub intercept:        f64,
  /// Pearson correlation coefficient, in `[-1, 1]`.
  pub r_value:          f64,
  /// Two-sided p-value for the null hypothesis `slope == 0`.
  pub p_value:          f64,
  /// Standard error of the slope.
  pub stderr:           f64,
  pub intercept_stderr: f64,
  pub n:                usize,
}

impl RegressionResult {
  pub fn predict(&self, x: f64) -> f64 { self.slope * x + self.intercept }
}

/// Fits a line through the paired samples `xs[i], ys[i]`.
///
/// Fails with [`PartitionError::InsufficientPoints`] for fewer than two pairs and with
/// [`PartitionError::ConstantX`] when every x is the same, since the slope is undefined then.
pub fn linregress(xs: &[f64], ys: &[f64]) -> Result<RegressionResult, PartitionError> {
  let n = xs.len().min(ys.len());
  let (xs, ys) = (&xs[..n], &ys[..n]);
  if n < 2 {
    return Err(PartitionError::InsufficientPoints(n));
  }

  // Compared on the samples: `sxx` of repeated values like 0.1 is not exactly 0.
  if xs.iter().all(|&x| x == xs[0]) {
    return Err(PartitionError::ConstantX(xs[0]));
  }

  let nf = n as f64;
  let x_mean = xs.iter().sum::<f64>() / nf;
  let y_mean = ys.iter().sum::<f64>() / nf;

  let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
  for (x, y) in xs.iter().zip(ys) {
    let dx = x - x_mean;
    let dy = y - y_mean;
    sxx += dx * dx;
    syy += dy * dy;
    sxy += dx * dy;
  }

  let slope = sxy / sxx;
  let intercept = y_mean - slope * x_mean;
  let r_value = if syy == 0.0 { 0.0 } else { (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0) };

  if n == 2 {
    let p_value = if ys[0] == ys[1] { 1.0 } else { 0.0 };
    return Ok(RegressionResult {
      slope,
      intercept,
      r_value,
      p_value,
      stderr: 0.0,
      intercept_stderr: 0.0,
      n,
    });
  }

  let df = nf - 2.0;
  let t = r_value * (df / ((1.0 - r_value) * (1.0 + r_value) + TINY)).sqrt();
  let p_value = StudentsT::new(0.0, 1.0, df)
    .map(|dist| (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
    .unwrap_or(f64::NAN);

  let sse: f64 = xs
    .iter()
    .zip(ys)
    .map(|(x, y)| {
      let residual = y - (slope * x + intercept);
      residual * residual
    })
    .sum();
  let stderr = (sse / df / sxx).sqrt();
  let intercept_stderr = stderr * (sxx / nf + x_mean * x_mean).sqrt();

  Ok(RegressionResult { slope, intercept, r_value, p_value, stderr, intercept_stderr, n })
}
