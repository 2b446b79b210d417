//! Residential property value prediction on the 2017 Zillow dataset.
//!
//! The pipeline runs acquire → prepare → split → model, with the
//! evaluator scoring every model against a constant baseline.

pub mod acquire;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod explore;
pub mod model;
pub mod prepare;

pub use acquire::{
    get_data, wrangle, zillow_sql, CsvCache, EnvMySqlSource, MySqlSource, SqlSource,
};
pub use config::{
    Config, DatabaseConfig, FeatureSet, Impute, ModelConfig, PrepareConfig, SplitConfig, Subgroup,
};
pub use error::{ZillowError, ZillowResult};
pub use evaluate::{
    baseline_errors, better_than_baseline, regression_errors, rmse, BaselineErrorReport,
    ErrorReport,
};
pub use model::{
    establish_baseline, fit_per_subgroup_models, fit_polynomial_model, produce_models, Baseline,
    BaselineKind, ModelResult, ModelResults, PolynomialFeatures,
};
pub use prepare::{prepare_data, remove_outliers, scale_data, split_data, MinMaxScaler};
