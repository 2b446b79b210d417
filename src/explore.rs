//! Exploratory summaries and the correlation significance test.
//!
//! Histogram and boxplot summaries carry the numbers a plot of the column
//! would show; rendering is left to the caller.

use std::fmt;

use polars::prelude::*;
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

use crate::config::PrepareConfig;
use crate::error::{ZillowError, ZillowResult};
use crate::evaluate::mean;
use crate::prepare::float_column;

/// Equal-width bin counts. `edges` has one more entry than `counts`; the
/// last bin includes its right edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

pub fn histogram(values: &[f64], bins: usize) -> ZillowResult<Histogram> {
    if values.is_empty() || bins == 0 {
        return Err(ZillowError::InvalidMetricInput(
            "histogram needs values and at least one bin".into(),
        ));
    }

    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0; bins];
    for &v in values {
        let bin = (((v - lo) / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }

    Ok(Histogram { edges, counts })
}

fn quantile(ca: &Float64Chunked, q: f64) -> ZillowResult<f64> {
    ca.quantile(q, QuantileInterpolOptions::Linear)?
        .ok_or_else(|| ZillowError::InvalidMetricInput("no values to summarise".into()))
}

/// Five-number summary with 1.5 IQR whiskers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Most extreme values inside the 1.5 IQR fences.
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: usize,
}

pub fn box_summary(values: &[f64]) -> ZillowResult<BoxSummary> {
    let ca = Float64Chunked::from_slice("values", values);
    let q1 = quantile(&ca, 0.25)?;
    let median = quantile(&ca, 0.5)?;
    let q3 = quantile(&ca, 0.75)?;

    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let inside = values
        .iter()
        .copied()
        .filter(|v| (lower_fence..=upper_fence).contains(v));

    Ok(BoxSummary {
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        q1,
        median,
        q3,
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        lower_whisker: inside.clone().fold(f64::INFINITY, f64::min),
        upper_whisker: inside.clone().fold(f64::NEG_INFINITY, f64::max),
        outliers: values.len() - inside.count(),
    })
}

/// Histogram and box summary for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct UnivariateSummary {
    pub column: String,
    pub histogram: Histogram,
    pub box_summary: BoxSummary,
}

/// Summaries for each column, ignoring missing values.
pub fn univariate_summaries(
    df: &DataFrame,
    columns: &[&str],
    bins: usize,
) -> ZillowResult<Vec<UnivariateSummary>> {
    columns
        .iter()
        .map(|&name| {
            let values: Vec<f64> = float_column(df, name)?.into_iter().flatten().collect();
            Ok(UnivariateSummary {
                column: name.to_string(),
                histogram: histogram(&values, bins)?,
                box_summary: box_summary(&values)?,
            })
        })
        .collect()
}

/// Outcome of a Pearson correlation test.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationResult {
    pub r: f64,
    pub statistic: f64,
    pub p_value: f64,
    pub n: usize,
    pub alpha: f64,
    /// `p_value < alpha`
    pub reject_null: bool,
}

impl fmt::Display for CorrelationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "r = {:.4}, p = {:.4e} (n = {})", self.r, self.p_value, self.n)?;
        if self.reject_null {
            write!(f, "Reject the null hypothesis: the variables are correlated.")
        } else {
            write!(f, "Fail to reject the null hypothesis: no significant correlation.")
        }
    }
}

/// Two-sided Pearson correlation test. Pairs with a NaN on either side are
/// skipped.
pub fn correlation_test(x: &[f64], y: &[f64], alpha: f64) -> ZillowResult<CorrelationResult> {
    if x.len() != y.len() {
        return Err(ZillowError::InvalidMetricInput(format!(
            "x has {} values, y has {}",
            x.len(),
            y.len()
        )));
    }

    let (x, y): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (*a, *b))
        .unzip();
    let n = x.len();
    if n < 3 {
        return Err(ZillowError::InvalidMetricInput(
            "correlation test requires at least 3 valid pairs".into(),
        ));
    }

    let (mx, my) = (mean(&x), mean(&y));
    let sxy: f64 = x.iter().zip(&y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let sxx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    let syy: f64 = y.iter().map(|b| (b - my).powi(2)).sum();
    if sxx == 0.0 || syy == 0.0 {
        return Err(ZillowError::InvalidMetricInput(
            "correlation is undefined for a constant series".into(),
        ));
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let dof = (n - 2) as f64;
    let (statistic, p_value) = if r.abs() == 1.0 {
        (r.signum() * f64::INFINITY, 0.0)
    } else {
        let t = r * (dof / (1.0 - r * r)).sqrt();
        let dist = StudentsT::new(0.0, 1.0, dof)
            .map_err(|e| ZillowError::InvalidMetricInput(e.to_string()))?;
        (t, 2.0 * (1.0 - dist.cdf(t.abs())))
    };
    debug!(r, statistic, p_value, n, "pearson correlation");

    Ok(CorrelationResult {
        r,
        statistic,
        p_value,
        n,
        alpha,
        reject_null: p_value < alpha,
    })
}

/// Correlation of `variable` against the prepared target at alpha 0.05.
pub fn statistical_test(
    df: &DataFrame,
    variable: &str,
    config: &PrepareConfig,
) -> ZillowResult<CorrelationResult> {
    let nan_for_null = |values: Vec<Option<f64>>| -> Vec<f64> {
        values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    };
    let x = nan_for_null(float_column(df, variable)?);
    let y = nan_for_null(float_column(df, config.prepared_target())?);
    correlation_test(&x, &y, 0.05)
}
