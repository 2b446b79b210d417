//! Baseline selection and degree-2 polynomial regression models.

use std::fmt;

use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use tracing::{debug, info};

use crate::config::{ModelConfig, Subgroup};
use crate::error::{ZillowError, ZillowResult};
use crate::evaluate::{mean, rmse};
use crate::prepare::{column, dense_column};

/// Which constant the baseline predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineKind {
    Mean,
    Median,
}

/// Constant prediction used as the no-skill reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub kind: BaselineKind,
    pub value: f64,
    /// `value` repeated once per target observation.
    pub predictions: Vec<f64>,
}

/// Picks the mean or the median of `target`, whichever has the lower RMSE.
/// The median has to be strictly better to win.
pub fn establish_baseline(target: &[f64]) -> ZillowResult<Baseline> {
    if target.is_empty() {
        return Err(ZillowError::InvalidMetricInput(
            "cannot build a baseline from an empty target".into(),
        ));
    }

    let mut sorted = target.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };
    let mean = mean(target);

    let median_series = vec![median; target.len()];
    let mean_series = vec![mean; target.len()];
    let median_rmse = rmse(target, &median_series)?;
    let mean_rmse = rmse(target, &mean_series)?;
    debug!(median, median_rmse, mean, mean_rmse, "baseline candidates");

    Ok(if median_rmse < mean_rmse {
        Baseline {
            kind: BaselineKind::Median,
            value: median,
            predictions: median_series,
        }
    } else {
        Baseline {
            kind: BaselineKind::Mean,
            value: mean,
            predictions: mean_series,
        }
    })
}

/// Degree-2 polynomial expansion without a bias column.
///
/// Output columns are the inputs followed by every product `x_i * x_j`
/// with `i <= j`, in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFeatures {
    input_names: Vec<String>,
}

impl PolynomialFeatures {
    pub fn fit(input_names: &[String]) -> Self {
        Self {
            input_names: input_names.to_vec(),
        }
    }

    pub fn n_output_features(&self) -> usize {
        let n = self.input_names.len();
        n + n * (n + 1) / 2
    }

    pub fn feature_names(&self) -> Vec<String> {
        let names = &self.input_names;
        let mut out = names.clone();
        for i in 0..names.len() {
            for j in i..names.len() {
                if i == j {
                    out.push(format!("{}^2", names[i]));
                } else {
                    out.push(format!("{} {}", names[i], names[j]));
                }
            }
        }
        out
    }

    pub fn transform(&self, x: &Array2<f64>) -> ZillowResult<Array2<f64>> {
        let n = self.input_names.len();
        if x.ncols() != n {
            return Err(ZillowError::Model(format!(
                "expected {n} input features, got {}",
                x.ncols()
            )));
        }

        let mut out = Array2::<f64>::zeros((x.nrows(), self.n_output_features()));
        for (row, values) in x.rows().into_iter().enumerate() {
            let mut col = 0;
            for &v in values.iter() {
                out[(row, col)] = v;
                col += 1;
            }
            for i in 0..n {
                for j in i..n {
                    out[(row, col)] = values[i] * values[j];
                    col += 1;
                }
            }
        }
        Ok(out)
    }
}

fn feature_matrix(df: &DataFrame, features: &[String]) -> ZillowResult<Array2<f64>> {
    for name in features {
        column(df, name)?;
    }

    let x = df
        .select(features.iter().map(String::as_str))?
        .to_ndarray::<Float64Type>(IndexOrder::C)?;
    if x.iter().any(|v| v.is_nan()) {
        return Err(ZillowError::SchemaMismatch {
            column: features.join(", "),
            reason: "feature columns contain missing values".to_string(),
        });
    }
    Ok(x)
}

/// Fits one linear regression on the degree-2 expansion of `features` in
/// the train frame, then predicts train and validate with it.
pub fn fit_polynomial_model(
    x_train: &DataFrame,
    y_train: &[f64],
    x_validate: &DataFrame,
    y_validate: &[f64],
    features: &[String],
) -> ZillowResult<(Vec<f64>, Vec<f64>)> {
    if x_train.height() != y_train.len() || x_validate.height() != y_validate.len() {
        return Err(ZillowError::InvalidMetricInput(format!(
            "feature rows ({}, {}) do not match target lengths ({}, {})",
            x_train.height(),
            x_validate.height(),
            y_train.len(),
            y_validate.len()
        )));
    }
    if y_train.is_empty() {
        return Err(ZillowError::InvalidMetricInput(
            "cannot fit a model on an empty train set".into(),
        ));
    }

    let poly = PolynomialFeatures::fit(features);
    let train_poly = poly.transform(&feature_matrix(x_train, features)?)?;
    let validate_poly = poly.transform(&feature_matrix(x_validate, features)?)?;

    let (train_z, validate_z) = standardize(&train_poly, &validate_poly)?;

    let dataset = Dataset::new(train_z, Array1::from_vec(y_train.to_vec()));
    let fitted = LinearRegression::new()
        .fit(&dataset)
        .map_err(|e| ZillowError::Model(e.to_string()))?;
    debug!(
        terms = ?poly.feature_names(),
        intercept = fitted.intercept(),
        "fitted polynomial regression"
    );

    let train_pred = fitted.predict(dataset.records());
    let validate_pred = fitted.predict(&validate_z);
    Ok((train_pred.to_vec(), validate_pred.to_vec()))
}

/// Z-scores both matrices with train statistics and drops columns that are
/// constant in train. With an intercept in the model, predictions are the
/// same as fitting the raw terms.
fn standardize(
    train: &Array2<f64>,
    validate: &Array2<f64>,
) -> ZillowResult<(Array2<f64>, Array2<f64>)> {
    let mean = train
        .mean_axis(Axis(0))
        .ok_or_else(|| ZillowError::InvalidMetricInput("empty train matrix".into()))?;
    let std = train.std_axis(Axis(0), 0.0);

    let keep: Vec<usize> = (0..std.len()).filter(|&j| std[j] > 1e-12).collect();
    if keep.len() < std.len() {
        debug!(dropped = std.len() - keep.len(), "constant polynomial terms left to the intercept");
    }

    let mean = mean.select(Axis(0), &keep);
    let std = std.select(Axis(0), &keep);
    let train = (&train.select(Axis(1), &keep) - &mean) / &std;
    let validate = (&validate.select(Axis(1), &keep) - &mean) / &std;
    Ok((train, validate))
}

/// Train and validate RMSE of one model, rounded to whole units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelResult {
    pub train_rmse: f64,
    pub validate_rmse: f64,
}

impl ModelResult {
    fn score(
        y_train: &[f64],
        train_pred: &[f64],
        y_validate: &[f64],
        validate_pred: &[f64],
    ) -> ZillowResult<Self> {
        Ok(Self {
            train_rmse: rmse(y_train, train_pred)?.round_ties_even(),
            validate_rmse: rmse(y_validate, validate_pred)?.round_ties_even(),
        })
    }
}

/// Model results in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResults {
    entries: Vec<(String, ModelResult)>,
}

impl ModelResults {
    pub fn insert(&mut self, name: &str, result: ModelResult) {
        match self.entries.iter().position(|(n, _)| n == name) {
            Some(i) => self.entries[i].1 = result,
            None => self.entries.push((name.to_string(), result)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelResult> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelResult)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ModelResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<20} {:>14} {:>14}", "model", "RMSE_train", "RMSE_validate")?;
        for (name, result) in self.iter() {
            write!(
                f,
                "\n{:<20} {:>14.0} {:>14.0}",
                name, result.train_rmse, result.validate_rmse
            )?;
        }
        Ok(())
    }
}

/// Scores the baseline and every configured feature set.
pub fn produce_models(
    train: &DataFrame,
    validate: &DataFrame,
    config: &ModelConfig,
) -> ZillowResult<ModelResults> {
    let y_train = dense_column(train, &config.target)?;
    let y_validate = dense_column(validate, &config.target)?;

    let mut results = ModelResults::default();

    let baseline = establish_baseline(&y_train)?;
    results.insert(
        "Baseline",
        ModelResult::score(
            &y_train,
            &baseline.predictions,
            &y_validate,
            &vec![baseline.value; y_validate.len()],
        )?,
    );

    for set in &config.feature_sets {
        let (train_pred, validate_pred) =
            fit_polynomial_model(train, &y_train, validate, &y_validate, &set.columns)?;
        let result = ModelResult::score(&y_train, &train_pred, &y_validate, &validate_pred)?;
        info!(
            model = set.name.as_str(),
            train_rmse = result.train_rmse,
            validate_rmse = result.validate_rmse,
            "scored model"
        );
        results.insert(&set.name, result);
    }

    Ok(results)
}

fn subgroup_rows(df: &DataFrame, indicator: &str) -> ZillowResult<DataFrame> {
    let mask: Vec<bool> = dense_column(df, indicator)?
        .into_iter()
        .map(|v| v == 1.0)
        .collect();
    Ok(df.filter(&BooleanChunked::from_slice(indicator, &mask))?)
}

fn fit_group(
    name: &str,
    train: &DataFrame,
    validate: &DataFrame,
    config: &ModelConfig,
) -> ZillowResult<ModelResult> {
    if train.height() == 0 || validate.height() == 0 {
        return Err(ZillowError::InvalidMetricInput(format!(
            "subgroup '{name}' has no rows in train or validate"
        )));
    }

    let y_train = dense_column(train, &config.target)?;
    let y_validate = dense_column(validate, &config.target)?;
    let (train_pred, validate_pred) = fit_polynomial_model(
        train,
        &y_train,
        validate,
        &y_validate,
        &config.subgroup_features,
    )?;
    let result = ModelResult::score(&y_train, &train_pred, &y_validate, &validate_pred)?;
    info!(
        subgroup = name,
        train_rows = train.height(),
        train_rmse = result.train_rmse,
        validate_rmse = result.validate_rmse,
        "scored subgroup model"
    );
    Ok(result)
}

/// Fits the subgroup feature set separately for each subgroup, plus one
/// aggregate model over all rows.
pub fn fit_per_subgroup_models(
    train: &DataFrame,
    validate: &DataFrame,
    subgroups: &[Subgroup],
    config: &ModelConfig,
) -> ZillowResult<ModelResults> {
    let mut results = ModelResults::default();

    for group in subgroups {
        let group_train = subgroup_rows(train, &group.indicator)?;
        let group_validate = subgroup_rows(validate, &group.indicator)?;
        let result = fit_group(&group.name, &group_train, &group_validate, config)?;
        results.insert(&group.name, result);
    }

    let aggregate = fit_group(&config.aggregate_name, train, validate, config)?;
    results.insert(&config.aggregate_name, aggregate);

    Ok(results)
}
