//! Cleaning, outlier trimming, splitting and scaling of the property dataset.

use polars::prelude::*;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{Impute, PrepareConfig, SplitConfig};
use crate::error::{ZillowError, ZillowResult};

pub(crate) fn column<'a>(df: &'a DataFrame, name: &str) -> ZillowResult<&'a Series> {
    df.column(name).map_err(|_| ZillowError::missing_column(name))
}

/// Values of a numeric column as `f64`, nulls kept.
pub(crate) fn float_column(df: &DataFrame, name: &str) -> ZillowResult<Vec<Option<f64>>> {
    let series = column(df, name)?;

    // CSV inference types a fully empty column as text
    let all_null = series.null_count() == series.len();
    if !series.dtype().is_numeric() && !all_null {
        return Err(ZillowError::SchemaMismatch {
            column: name.to_string(),
            reason: format!("expected a numeric column, found {}", series.dtype()),
        });
    }

    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Values of a numeric column that must not contain nulls.
pub(crate) fn dense_column(df: &DataFrame, name: &str) -> ZillowResult<Vec<f64>> {
    float_column(df, name)?
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| ZillowError::SchemaMismatch {
                column: name.to_string(),
                reason: "unexpected missing value".to_string(),
            })
        })
        .collect()
}

pub(crate) fn take_rows(df: &DataFrame, rows: &[usize]) -> ZillowResult<DataFrame> {
    let indices = UInt32Chunked::from_vec("", rows.iter().map(|&i| i as u32).collect());
    Ok(df.take(&indices)?)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn mode(values: &mut [f64]) -> Option<f64> {
    values.sort_by(|a, b| a.total_cmp(b));

    let mut best: Option<(f64, usize)> = None;
    for run in values.chunk_by(|a, b| a == b) {
        // strictly greater keeps the smallest value on ties
        if best.map_or(true, |(_, count)| run.len() > count) {
            best = Some((run[0], run.len()));
        }
    }
    best.map(|(value, _)| value)
}

fn fill_value(values: &[Option<f64>], strategy: Impute) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    match strategy {
        Impute::Zero => Some(0.0),
        Impute::Mean if present.is_empty() => None,
        Impute::Mean => Some(present.iter().sum::<f64>() / present.len() as f64),
        Impute::Median => median(&mut present),
        Impute::Mode => mode(&mut present),
    }
}

fn impute_column(df: &mut DataFrame, name: &str, strategy: Impute) -> ZillowResult<()> {
    let values = float_column(df, name)?;
    if values.iter().all(Option::is_some) {
        return Ok(());
    }

    let fill = fill_value(&values, strategy).ok_or_else(|| ZillowError::SchemaMismatch {
        column: name.to_string(),
        reason: "no values to impute from".to_string(),
    })?;
    debug!(column = name, ?strategy, fill, "imputing missing values");

    let filled: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(fill)).collect();
    df.with_column(Series::new(name, filled))?;
    Ok(())
}

fn fill_missing_values(df: &mut DataFrame, config: &PrepareConfig) -> ZillowResult<()> {
    for (name, strategy) in &config.imputations {
        impute_column(df, name, *strategy)?;
    }

    let remaining: Vec<(String, Impute)> = df
        .get_columns()
        .iter()
        .filter(|s| s.null_count() > 0)
        .filter(|s| s.name() != config.target)
        .filter(|s| !config.drop_columns.iter().any(|d| d == s.name()))
        .filter(|s| s.dtype().is_numeric())
        .map(|s| {
            let strategy = if s.name() == config.location_column {
                Impute::Mode
            } else {
                Impute::Mean
            };
            (s.name().to_string(), strategy)
        })
        .collect();

    for (name, strategy) in remaining {
        impute_column(df, &name, strategy)?;
    }
    Ok(())
}

fn cast_columns(df: &mut DataFrame, config: &PrepareConfig) -> ZillowResult<()> {
    for name in &config.integer_columns {
        let values: Vec<i64> = dense_column(df, name)?.into_iter().map(|v| v as i64).collect();
        df.with_column(Series::new(name, values))?;
    }
    Ok(())
}

fn one_hot_encode(df: DataFrame, name: &str) -> ZillowResult<DataFrame> {
    let codes: Vec<i64> = dense_column(&df, name)?.into_iter().map(|v| v as i64).collect();

    let mut distinct = codes.clone();
    distinct.sort_unstable();
    distinct.dedup();

    let mut df = df.drop(name)?;
    for code in distinct {
        let indicator: Vec<i64> = codes.iter().map(|&c| i64::from(c == code)).collect();
        df.with_column(Series::new(&format!("{name}_{code}"), indicator))?;
    }
    Ok(df)
}

fn flag(values: &[f64]) -> impl Iterator<Item = i64> + '_ {
    values.iter().map(|&v| i64::from(v > 0.0))
}

fn derive_features(df: DataFrame, config: &PrepareConfig) -> ZillowResult<DataFrame> {
    let year_built = dense_column(&df, &config.year_built_column)?;
    let reference = f64::from(config.reference_year);
    let age: Vec<f64> = year_built.iter().map(|y| reference - y).collect();

    let mut df = df.drop(&config.year_built_column)?;
    df.with_column(Series::new("property_age", age))?;

    let hot_tub = dense_column(&df, &config.hot_tub_column)?;
    let pool = dense_column(&df, &config.pool_column)?;
    let fireplace = dense_column(&df, &config.fireplace_column)?;
    let amenities: Vec<i64> = flag(&hot_tub)
        .zip(flag(&pool))
        .zip(flag(&fireplace))
        .map(|((t, p), f)| t + p + f)
        .collect();
    df.with_column(Series::new("amenities", amenities))?;

    Ok(df)
}

fn drop_columns(mut df: DataFrame, config: &PrepareConfig) -> ZillowResult<DataFrame> {
    for name in &config.drop_columns {
        if df.get_column_names().contains(&name.as_str()) {
            df = df.drop(name)?;
        } else {
            debug!(column = name.as_str(), "column already absent, not dropped");
        }
    }
    Ok(df)
}

fn rename_columns(df: &mut DataFrame, config: &PrepareConfig) -> ZillowResult<()> {
    let one_hot = format!("{}_", config.location_column);
    let mut renames: Vec<(String, String)> = df
        .get_column_names()
        .iter()
        .filter_map(|name| {
            name.strip_prefix(&one_hot)
                .map(|code| (name.to_string(), format!("{}_{code}", config.one_hot_prefix)))
        })
        .collect();
    renames.extend(config.renames.iter().cloned());

    for (from, to) in renames {
        if df.get_column_names().contains(&from.as_str()) {
            df.rename(&from, &to)?;
        }
    }
    Ok(())
}

fn required_columns(config: &PrepareConfig) -> Vec<&str> {
    let mut required = vec![
        config.target.as_str(),
        config.location_column.as_str(),
        config.year_built_column.as_str(),
        config.hot_tub_column.as_str(),
        config.pool_column.as_str(),
        config.fireplace_column.as_str(),
    ];
    required.extend(config.integer_columns.iter().map(String::as_str));
    required.extend(config.imputations.iter().map(|(name, _)| name.as_str()));
    required
}

/// Cleans the raw property data.
///
/// Steps run in a fixed order: drop rows missing the target, impute,
/// cast and one-hot encode the location code, derive `property_age` and
/// `amenities`, drop low-value columns, rename to readable names.
pub fn prepare_data(raw: &DataFrame, config: &PrepareConfig) -> ZillowResult<DataFrame> {
    let present = raw.get_column_names();
    if let Some(missing) = required_columns(config)
        .into_iter()
        .find(|name| !present.contains(name))
    {
        return Err(ZillowError::missing_column(missing));
    }

    let target = float_column(raw, &config.target)?;
    let has_target: Vec<bool> = target.iter().map(Option::is_some).collect();
    let mut df = raw.filter(&BooleanChunked::from_slice("has_target", &has_target))?;
    info!(
        rows = df.height(),
        dropped = raw.height() - df.height(),
        "dropped rows missing the target"
    );

    fill_missing_values(&mut df, config)?;
    cast_columns(&mut df, config)?;

    let df = one_hot_encode(df, &config.location_column)?;
    let df = derive_features(df, config)?;
    let mut df = drop_columns(df, config)?;
    rename_columns(&mut df, config)?;

    info!(rows = df.height(), columns = df.width(), "prepared property data");
    Ok(df)
}

/// Drops rows outside `(Q1 - k*IQR, Q3 + k*IQR)` for each column in turn.
///
/// Each column is filtered on the output of the previous one, so the
/// order of `columns` can change which rows survive.
pub fn remove_outliers(df: &DataFrame, k: f64, columns: &[&str]) -> ZillowResult<DataFrame> {
    let mut df = df.clone();

    for &name in columns {
        let values = float_column(&df, name)?;
        let series = Series::new(name, &values);
        let ca = series.f64()?;

        let (Some(q1), Some(q3)) = (
            ca.quantile(0.25, QuantileInterpolOptions::Linear)?,
            ca.quantile(0.75, QuantileInterpolOptions::Linear)?,
        ) else {
            continue;
        };

        let iqr = q3 - q1;
        let lower = q1 - k * iqr;
        let upper = q3 + k * iqr;

        let keep: Vec<bool> = values
            .iter()
            .map(|v| v.map_or(false, |v| v > lower && v < upper))
            .collect();
        let before = df.height();
        df = df.filter(&BooleanChunked::from_slice("keep", &keep))?;
        debug!(column = name, lower, upper, removed = before - df.height(), "removed outliers");
    }

    Ok(df)
}

fn strata(df: &DataFrame, name: &str) -> ZillowResult<Vec<String>> {
    let series = column(df, name)?;
    (0..series.len())
        .map(|i| -> ZillowResult<String> { Ok(series.get(i)?.to_string()) })
        .collect()
}

/// Indices of rows held out. Each stratum contributes its proportional
/// share, with leftover slots going to the largest remainders.
fn held_out_rows(n_held: usize, labels: &[String], rng: &mut StdRng) -> Vec<usize> {
    let n = labels.len();
    if n == 0 {
        return Vec::new();
    }

    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    for (row, label) in labels.iter().enumerate() {
        match groups.iter_mut().find(|(l, _)| *l == label.as_str()) {
            Some((_, rows)) => rows.push(row),
            None => groups.push((label.as_str(), vec![row])),
        }
    }

    let exact: Vec<f64> = groups
        .iter()
        .map(|(_, rows)| rows.len() as f64 * n_held as f64 / n as f64)
        .collect();
    let mut quota: Vec<usize> = exact.iter().map(|q| q.floor() as usize).collect();

    let mut by_remainder: Vec<usize> = (0..groups.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra)
    });
    let assigned: usize = quota.iter().sum();
    for &g in by_remainder.iter().take(n_held.saturating_sub(assigned)) {
        quota[g] += 1;
    }

    let mut held = Vec::with_capacity(n_held);
    for ((_, rows), take) in groups.iter_mut().zip(quota) {
        rows.shuffle(rng);
        held.extend(rows.iter().take(take).copied());
    }
    held
}

/// Splits `df` into (kept, held out) with `fraction` of rows held out,
/// rounded up.
fn split_frame(
    df: &DataFrame,
    fraction: f64,
    seed: u64,
    stratify: Option<&str>,
) -> ZillowResult<(DataFrame, DataFrame)> {
    let n = df.height();
    let n_held = ((n as f64 * fraction).ceil() as usize).min(n);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut held = match stratify {
        Some(name) => {
            let labels = strata(df, name)?;
            held_out_rows(n_held, &labels, &mut rng)
        }
        None => {
            let mut rows: Vec<usize> = (0..n).collect();
            rows.shuffle(&mut rng);
            rows.truncate(n_held);
            rows
        }
    };

    let mut is_held = vec![false; n];
    for &row in &held {
        is_held[row] = true;
    }
    let mut kept: Vec<usize> = (0..n).filter(|&row| !is_held[row]).collect();
    kept.shuffle(&mut rng);
    held.shuffle(&mut rng);

    Ok((take_rows(df, &kept)?, take_rows(df, &held)?))
}

/// Splits prepared data into train, validate and test.
///
/// Test takes `test_fraction` of all rows; validate takes
/// `validate_fraction` of what is left. With the defaults that is
/// 56% / 24% / 20%. Both stages are seeded with `random_seed`.
pub fn split_data(
    df: &DataFrame,
    config: &SplitConfig,
) -> ZillowResult<(DataFrame, DataFrame, DataFrame)> {
    let stratify = config.stratify.as_deref();

    let (train_validate, test) =
        split_frame(df, config.test_fraction, config.random_seed, stratify)?;
    let (train, validate) = split_frame(
        &train_validate,
        config.validate_fraction,
        config.random_seed,
        stratify,
    )?;

    info!(
        train = train.height(),
        validate = validate.height(),
        test = test.height(),
        "split data"
    );
    Ok((train, validate, test))
}

/// Min-max scaler fitted on the numeric columns of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    columns: Vec<String>,
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

impl MinMaxScaler {
    /// Records the min and max of every numeric column in `df`.
    pub fn fit(df: &DataFrame) -> ZillowResult<Self> {
        if df.height() == 0 {
            return Err(ZillowError::InvalidMetricInput(
                "cannot fit a scaler on an empty frame".into(),
            ));
        }

        let columns: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|s| s.dtype().is_numeric())
            .map(|s| s.name().to_string())
            .collect();

        let mut data_min = Vec::with_capacity(columns.len());
        let mut data_max = Vec::with_capacity(columns.len());
        for name in &columns {
            let values = float_column(df, name)?;
            let present = values.iter().flatten();
            data_min.push(present.clone().copied().fold(f64::INFINITY, f64::min));
            data_max.push(present.copied().fold(f64::NEG_INFINITY, f64::max));
        }

        Ok(Self {
            columns,
            data_min,
            data_max,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn data_min(&self) -> &[f64] {
        &self.data_min
    }

    pub fn data_max(&self) -> &[f64] {
        &self.data_max
    }

    /// Applies the fitted ranges. Values outside the fitted range land
    /// outside [0, 1]; constant columns map to 0.
    pub fn transform(&self, df: &DataFrame) -> ZillowResult<DataFrame> {
        let mut out = df.clone();
        for ((name, &min), &max) in self.columns.iter().zip(&self.data_min).zip(&self.data_max) {
            let range = max - min;
            if range.abs() <= 1e-10 {
                warn!(column = name.as_str(), "constant column scaled to zero");
            }
            let scaled: Vec<Option<f64>> = float_column(df, name)?
                .into_iter()
                .map(|v| {
                    v.map(|v| if range.abs() > 1e-10 { (v - min) / range } else { 0.0 })
                })
                .collect();
            out.with_column(Series::new(name, scaled))?;
        }
        Ok(out)
    }
}

/// Scales every numeric column with ranges taken from `train` only.
pub fn scale_data(
    train: &DataFrame,
    validate: &DataFrame,
    test: &DataFrame,
) -> ZillowResult<(DataFrame, DataFrame, DataFrame, MinMaxScaler)> {
    let scaler = MinMaxScaler::fit(train)?;
    Ok((
        scaler.transform(train)?,
        scaler.transform(validate)?,
        scaler.transform(test)?,
        scaler,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    fn raw_frame() -> DataFrame {
        let sqft = [
            Some(1000.0),
            Some(1500.0),
            None,
            Some(2000.0),
            Some(1200.0),
            Some(1800.0),
            Some(2500.0),
            Some(900.0),
            Some(1600.0),
            Some(1400.0),
        ];
        df!(
            "parcelid" => (1..=10).collect::<Vec<i64>>(),
            "bedroomcnt" => [3.0, 4.0, 3.0, 5.0, 2.0, 4.0, 5.0, 2.0, 3.0, 3.0],
            "bathroomcnt" => [2.0, 2.5, 2.0, 3.0, 1.0, 2.0, 4.0, 1.0, 2.0, 2.0],
            "calculatedfinishedsquarefeet" => sqft,
            "taxvaluedollarcnt" => [
                300_000.0, 450_000.0, 380_000.0, 600_000.0, 250_000.0,
                520_000.0, 900_000.0, 200_000.0, 410_000.0, 360_000.0,
            ],
            "yearbuilt" => [Some(1960.0), Some(1985.0), None, Some(2001.0), Some(1950.0),
                            Some(1985.0), Some(2010.0), Some(1940.0), Some(1975.0), Some(1990.0)],
            "fips" => [6037.0, 6037.0, 6059.0, 6111.0, 6037.0, 6059.0, 6059.0, 6037.0, 6111.0, 6037.0],
            "fireplacecnt" => [None, Some(1.0), None, Some(2.0), None, None, Some(1.0), None, None, None],
            "hashottuborspa" => [None, Some(1.0), None, None, None, None, Some(1.0), None, None, None],
            "poolcnt" => [None, None, Some(1.0), Some(1.0), None, None, Some(1.0), None, None, None],
            "buildingqualitytypeid" => [Some(6.0), None, Some(8.0), Some(4.0), Some(7.0),
                                        Some(6.0), None, Some(9.0), Some(5.0), Some(6.0)],
            "lotsizesquarefeet" => [Some(5000.0), Some(7000.0), None, Some(9000.0), Some(4000.0),
                                    Some(6000.0), Some(12000.0), None, Some(5500.0), Some(6500.0)],
            "roomcnt" => [0.0; 10],
        )
        .unwrap()
    }

    #[test]
    fn test_prepare_imputes_square_feet_with_mean() {
        let prepared = prepare_data(&raw_frame(), &PrepareConfig::default()).unwrap();
        let sqft = float_column(&prepared, "square_feet").unwrap();

        assert!(sqft.iter().all(Option::is_some));
        let expected = (1000.0 + 1500.0 + 2000.0 + 1200.0 + 1800.0 + 2500.0 + 900.0 + 1600.0
            + 1400.0)
            / 9.0;
        assert_relative_eq!(sqft[2].unwrap(), expected);
    }

    #[test]
    fn test_prepare_leaves_no_missing_values() {
        let prepared = prepare_data(&raw_frame(), &PrepareConfig::default()).unwrap();
        for series in prepared.get_columns() {
            assert_eq!(series.null_count(), 0, "{} has nulls", series.name());
        }
    }

    #[test]
    fn test_prepare_renames_and_drops() {
        let prepared = prepare_data(&raw_frame(), &PrepareConfig::default()).unwrap();
        let names = prepared.get_column_names();

        for expected in [
            "bedroom_count",
            "bathroom_count",
            "square_feet",
            "property_tax_assessed_values",
            "building_quality",
            "lot_size",
            "property_age",
            "amenities",
            "fed_code_6037",
            "fed_code_6059",
            "fed_code_6111",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        for dropped in ["parcelid", "yearbuilt", "fips", "fireplacecnt", "poolcnt", "roomcnt"] {
            assert!(!names.contains(&dropped), "{dropped} should be dropped");
        }
    }

    #[test]
    fn test_prepare_drops_rows_missing_target() {
        let mut raw = raw_frame();
        let target: Vec<Option<f64>> = float_column(&raw, "taxvaluedollarcnt")
            .unwrap()
            .into_iter()
            .enumerate()
            .map(|(i, v)| if i == 0 { None } else { v })
            .collect();
        raw.with_column(Series::new("taxvaluedollarcnt", target)).unwrap();

        let prepared = prepare_data(&raw, &PrepareConfig::default()).unwrap();
        assert_eq!(prepared.height(), 9);
    }

    #[test]
    fn test_prepare_derives_age_and_amenities() {
        let prepared = prepare_data(&raw_frame(), &PrepareConfig::default()).unwrap();
        let age = dense_column(&prepared, "property_age").unwrap();
        let amenities = dense_column(&prepared, "amenities").unwrap();

        assert_eq!(age[0], 57.0);
        // missing year built takes the mode (1985)
        assert_eq!(age[2], 32.0);
        assert_eq!(amenities, vec![0.0, 2.0, 1.0, 2.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_one_hot_columns_are_exclusive() {
        let prepared = prepare_data(&raw_frame(), &PrepareConfig::default()).unwrap();
        let columns: Vec<Vec<f64>> = ["fed_code_6037", "fed_code_6059", "fed_code_6111"]
            .iter()
            .map(|c| dense_column(&prepared, c).unwrap())
            .collect();
        for row in 0..prepared.height() {
            let total: f64 = columns.iter().map(|c| c[row]).sum();
            assert_eq!(total, 1.0);
        }
    }

    #[test]
    fn test_prepare_missing_column() {
        let raw = raw_frame().drop("yearbuilt").unwrap();
        let result = prepare_data(&raw, &PrepareConfig::default());
        assert!(matches!(
            result,
            Err(ZillowError::SchemaMismatch { ref column, .. }) if column == "yearbuilt"
        ));
    }

    #[test]
    fn test_prepare_rejects_text_in_numeric_column() {
        let mut raw = raw_frame();
        raw.with_column(Series::new("bedroomcnt", vec!["two"; 10])).unwrap();
        let result = prepare_data(&raw, &PrepareConfig::default());
        assert!(matches!(result, Err(ZillowError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_remove_outliers_drops_extreme_value() {
        let df = df!("value" => [1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        let filtered = remove_outliers(&df, 1.5, &["value"]).unwrap();
        assert_eq!(dense_column(&filtered, "value").unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_remove_outliers_is_sequential() {
        // b = 50 is only an outlier once the a = 1000 row is gone
        let df = df!(
            "a" => [1000.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            "b" => [100.0, 50.0, 1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();

        let a_first = remove_outliers(&df, 1.5, &["a", "b"]).unwrap();
        let b_first = remove_outliers(&df, 1.5, &["b", "a"]).unwrap();

        assert_eq!(dense_column(&a_first, "a").unwrap(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(dense_column(&b_first, "a").unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_ne!(a_first.height(), b_first.height());
    }

    #[test]
    fn test_remove_outliers_drops_values_on_fence() {
        // q1 = 2, q3 = 4, so k = 0.5 puts the fences at 1 and 5
        let df = df!("value" => [1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let filtered = remove_outliers(&df, 0.5, &["value"]).unwrap();
        assert_eq!(dense_column(&filtered, "value").unwrap(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_remove_outliers_unknown_column() {
        let df = df!("value" => [1.0, 2.0]).unwrap();
        assert!(remove_outliers(&df, 1.5, &["missing"]).is_err());
    }

    fn hundred_rows() -> DataFrame {
        df!(
            "id" => (0..100).collect::<Vec<i64>>(),
            "group" => (0..100).map(|i| if i % 4 == 0 { "a" } else { "b" }).collect::<Vec<_>>(),
        )
        .unwrap()
    }

    fn ids(df: &DataFrame) -> Vec<i64> {
        dense_column(df, "id").unwrap().into_iter().map(|v| v as i64).collect()
    }

    #[test]
    fn test_split_proportions_and_partition() {
        let df = hundred_rows();
        let (train, validate, test) = split_data(&df, &SplitConfig::default()).unwrap();

        assert_eq!(train.height(), 56);
        assert_eq!(validate.height(), 24);
        assert_eq!(test.height(), 20);

        let mut all: Vec<i64> = ids(&train);
        all.extend(ids(&validate));
        all.extend(ids(&test));
        let unique: HashSet<i64> = all.iter().copied().collect();
        assert_eq!(all.len(), 100);
        assert_eq!(unique.len(), 100);
    }

    #[test]
    fn test_split_is_reproducible() {
        let df = hundred_rows();
        let first = split_data(&df, &SplitConfig::default()).unwrap();
        let second = split_data(&df, &SplitConfig::default()).unwrap();
        assert_eq!(ids(&first.0), ids(&second.0));
        assert_eq!(ids(&first.2), ids(&second.2));

        let other = SplitConfig {
            random_seed: 7,
            ..Default::default()
        };
        let third = split_data(&df, &other).unwrap();
        assert_ne!(ids(&first.2), ids(&third.2));
    }

    #[test]
    fn test_split_stratified_keeps_group_share() {
        let df = hundred_rows();
        let config = SplitConfig {
            stratify: Some("group".into()),
            ..Default::default()
        };
        let (train, validate, test) = split_data(&df, &config).unwrap();
        assert_eq!(train.height() + validate.height() + test.height(), 100);

        let group_a = |df: &DataFrame| ids(df).iter().filter(|&&id| id % 4 == 0).count();
        assert_eq!(test.height(), 20);
        assert_eq!(group_a(&test), 5);
        assert_eq!(group_a(&train) + group_a(&validate), 20);
    }

    #[test]
    fn test_split_unknown_stratify_column() {
        let config = SplitConfig {
            stratify: Some("missing".into()),
            ..Default::default()
        };
        assert!(split_data(&hundred_rows(), &config).is_err());
    }

    #[test]
    fn test_scale_uses_train_ranges() {
        let train = df!("x" => [10.0, 20.0, 30.0], "label" => ["a", "b", "c"]).unwrap();
        let validate = df!("x" => [5.0, 25.0], "label" => ["a", "b"]).unwrap();
        let test = df!("x" => [40.0], "label" => ["c"]).unwrap();

        let (train, validate, test, scaler) = scale_data(&train, &validate, &test).unwrap();

        assert_eq!(scaler.columns(), &["x".to_string()]);
        assert_eq!(scaler.data_min(), &[10.0]);
        assert_eq!(scaler.data_max(), &[30.0]);

        let train_x = dense_column(&train, "x").unwrap();
        assert!(train_x.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(dense_column(&validate, "x").unwrap(), vec![-0.25, 0.75]);
        assert_eq!(dense_column(&test, "x").unwrap(), vec![1.5]);
        assert!(train.column("label").unwrap().dtype() == &DataType::Utf8);
    }

    #[test]
    fn test_scale_constant_column() {
        let train = df!("x" => [3.0, 3.0]).unwrap();
        let scaler = MinMaxScaler::fit(&train).unwrap();
        let scaled = scaler.transform(&train).unwrap();
        assert_eq!(dense_column(&scaled, "x").unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_mode_prefers_smallest_on_ties() {
        assert_eq!(mode(&mut [3.0, 1.0, 3.0, 1.0, 2.0]), Some(1.0));
        assert_eq!(mode(&mut []), None);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut [5.0, 1.0, 3.0]), Some(3.0));
    }
}
