//! Regression error metrics and baseline comparison.

use std::fmt;

use crate::error::{ZillowError, ZillowResult};

/// Error decomposition for a regression model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorReport {
    pub sse: f64,
    pub ess: f64,
    /// Always `sse + ess`.
    pub tss: f64,
    pub mse: f64,
    pub rmse: f64,
}

/// Error metrics for a constant baseline prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineErrorReport {
    pub sse: f64,
    pub mse: f64,
    pub rmse: f64,
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sum of squared errors (SSE):     {}", self.sse)?;
        writeln!(f, "explained sum of squares (ESS):  {}", self.ess)?;
        writeln!(f, "total sum of squares (TSS):      {}", self.tss)?;
        writeln!(f, "mean squared error (MSE):        {}", self.mse)?;
        write!(f, "root mean squared error (RMSE):  {}", self.rmse)
    }
}

impl fmt::Display for BaselineErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sum of squared errors (SSE):     {}", self.sse)?;
        writeln!(f, "mean squared error (MSE):        {}", self.mse)?;
        write!(f, "root mean squared error (RMSE):  {}", self.rmse)
    }
}

fn check_inputs(actual: &[f64], predicted: &[f64]) -> ZillowResult<()> {
    if actual.is_empty() {
        return Err(ZillowError::InvalidMetricInput(
            "actual values cannot be empty".into(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(ZillowError::InvalidMetricInput(format!(
            "actual has {} values, predicted has {}",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean squared error.
pub fn mse(actual: &[f64], predicted: &[f64]) -> ZillowResult<f64> {
    check_inputs(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Root mean squared error.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> ZillowResult<f64> {
    Ok(mse(actual, predicted)?.sqrt())
}

/// `actual - predicted` per observation.
pub fn residuals(actual: &[f64], predicted: &[f64]) -> ZillowResult<Vec<f64>> {
    check_inputs(actual, predicted)?;
    Ok(actual.iter().zip(predicted).map(|(a, p)| a - p).collect())
}

/// SSE, ESS, TSS, MSE and RMSE for a set of predictions.
pub fn regression_errors(actual: &[f64], predicted: &[f64]) -> ZillowResult<ErrorReport> {
    let mse = mse(actual, predicted)?;
    let sse = mse * actual.len() as f64;

    let actual_mean = mean(actual);
    let ess: f64 = predicted.iter().map(|p| (p - actual_mean).powi(2)).sum();

    Ok(ErrorReport {
        sse,
        ess,
        tss: sse + ess,
        mse,
        rmse: mse.sqrt(),
    })
}

/// SSE, MSE and RMSE of a baseline series.
pub fn baseline_errors(actual: &[f64], baseline: &[f64]) -> ZillowResult<BaselineErrorReport> {
    let mse = mse(actual, baseline)?;
    Ok(BaselineErrorReport {
        sse: mse * actual.len() as f64,
        mse,
        rmse: mse.sqrt(),
    })
}

/// True when the predictions beat a constant mean baseline on RMSE.
/// Ties go to the baseline.
pub fn better_than_baseline(actual: &[f64], predicted: &[f64]) -> ZillowResult<bool> {
    check_inputs(actual, predicted)?;
    let baseline = vec![mean(actual); actual.len()];
    Ok(rmse(actual, predicted)? < rmse(actual, &baseline)?)
}
