//! Configuration for each pipeline stage.
//!
//! Defaults reproduce the 2017 Zillow project: reference year 2017, split
//! seed 24, the Codeup `zillow` schema column names.

use std::path::PathBuf;

use crate::error::{ZillowError, ZillowResult};

/// Name of the MySQL database holding the 2017 property tables.
pub const ZILLOW_DB: &str = "zillow";

/// Default location of the cached query result.
pub const ZILLOW_FILE: &str = "zillow.csv";

/// How missing values in a column are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impute {
    Mean,
    Median,
    /// Most frequent value, smallest value on ties.
    Mode,
    Zero,
}

/// Settings for [`crate::prepare::prepare_data`].
#[derive(Debug, Clone)]
pub struct PrepareConfig {
    /// Raw target column. Rows missing it are dropped, never imputed.
    pub target: String,
    /// Categorical location code that gets one-hot encoded.
    pub location_column: String,
    pub year_built_column: String,
    /// `property_age` is measured against this year.
    pub reference_year: i32,
    pub hot_tub_column: String,
    pub pool_column: String,
    pub fireplace_column: String,
    /// Columns cast to integers after imputation.
    pub integer_columns: Vec<String>,
    /// Applied in order. Numeric columns not listed fall back to the mean.
    pub imputations: Vec<(String, Impute)>,
    pub drop_columns: Vec<String>,
    pub renames: Vec<(String, String)>,
    /// One-hot columns `<location_column>_<code>` are renamed to
    /// `<one_hot_prefix>_<code>`.
    pub one_hot_prefix: String,
}

impl PrepareConfig {
    /// Name of the target column once renames are applied.
    pub fn prepared_target(&self) -> &str {
        self.renamed(&self.target)
    }

    /// Final name of a raw column.
    pub fn renamed<'a>(&'a self, column: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(from, _)| from == column)
            .map(|(_, to)| to.as_str())
            .unwrap_or(column)
    }
}

impl Default for PrepareConfig {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            target: "taxvaluedollarcnt".into(),
            location_column: "fips".into(),
            year_built_column: "yearbuilt".into(),
            reference_year: 2017,
            hot_tub_column: "hashottuborspa".into(),
            pool_column: "poolcnt".into(),
            fireplace_column: "fireplacecnt".into(),
            integer_columns: owned(&["bedroomcnt", "fireplacecnt", "hashottuborspa", "poolcnt"]),
            imputations: vec![
                ("calculatedfinishedsquarefeet".into(), Impute::Mean),
                ("yearbuilt".into(), Impute::Mode),
                ("fireplacecnt".into(), Impute::Zero),
                ("hashottuborspa".into(), Impute::Zero),
                ("poolcnt".into(), Impute::Zero),
                ("buildingqualitytypeid".into(), Impute::Median),
                ("lotsizesquarefeet".into(), Impute::Median),
            ],
            drop_columns: owned(&[
                "parcelid",
                "numberofstories",
                "basementsqft",
                "heatingorsystemdesc",
                "airconditioningdesc",
                "garagetotalsqft",
                "poolsizesum",
                "yardbuildingsqft17",
                "roomcnt",
                "finishedfloor1squarefeet",
                "finishedsquarefeet15",
                "fireplacecnt",
                "hashottuborspa",
                "poolcnt",
            ]),
            renames: vec![
                ("bedroomcnt".into(), "bedroom_count".into()),
                ("bathroomcnt".into(), "bathroom_count".into()),
                ("calculatedfinishedsquarefeet".into(), "square_feet".into()),
                ("taxvaluedollarcnt".into(), "property_tax_assessed_values".into()),
                ("buildingqualitytypeid".into(), "building_quality".into()),
                ("lotsizesquarefeet".into(), "lot_size".into()),
            ],
            one_hot_prefix: "fed_code".into(),
        }
    }
}

/// Settings for [`crate::prepare::split_data`].
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Share of all rows held out as test.
    pub test_fraction: f64,
    /// Share of the remaining rows held out as validate.
    pub validate_fraction: f64,
    /// Seeds both split stages.
    pub random_seed: u64,
    pub stratify: Option<String>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            validate_fraction: 0.3,
            random_seed: 24,
            stratify: None,
        }
    }
}

/// A named list of feature columns fed to one polynomial model.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub name: String,
    pub columns: Vec<String>,
}

impl FeatureSet {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Rows whose `indicator` column equals 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Subgroup {
    pub name: String,
    pub indicator: String,
}

impl Subgroup {
    pub fn new(name: &str, indicator: &str) -> Self {
        Self {
            name: name.to_string(),
            indicator: indicator.to_string(),
        }
    }
}

/// Settings for [`crate::model`].
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Prepared target column.
    pub target: String,
    pub feature_sets: Vec<FeatureSet>,
    pub subgroup_features: Vec<String>,
    pub subgroups: Vec<Subgroup>,
    /// Name of the aggregate entry in per-subgroup results.
    pub aggregate_name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let primary = ["square_feet", "bedroom_count", "bathroom_count"];
        let with_amenities = ["square_feet", "bedroom_count", "bathroom_count", "amenities"];

        Self {
            target: "property_tax_assessed_values".into(),
            feature_sets: vec![
                FeatureSet::new("Model_1", &primary),
                FeatureSet::new("Model_2", &with_amenities),
            ],
            subgroup_features: with_amenities.iter().map(|c| c.to_string()).collect(),
            subgroups: vec![
                Subgroup::new("Los_Angeles_County", "fed_code_6037"),
                Subgroup::new("Orange_County", "fed_code_6059"),
                Subgroup::new("Ventura_County", "fed_code_6111"),
            ],
            aggregate_name: "All_Counties".into(),
        }
    }
}

/// Connection settings for the source database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
}

impl DatabaseConfig {
    /// Reads `DATABASE_URL`, or builds a MySQL URL for the `zillow` database
    /// from `DB_HOST`, `DB_USER` and `DB_PASSWORD`.
    pub fn from_env() -> ZillowResult<Self> {
        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            return Ok(Self { database_url });
        }

        let var = |name: &str| {
            std::env::var(name)
                .map_err(|_| ZillowError::DataUnavailable(format!("{name} must be provided")))
        };
        let host = var("DB_HOST")?;
        let user = var("DB_USER")?;
        let password = var("DB_PASSWORD")?;

        Ok(Self {
            database_url: format!("mysql://{user}:{password}@{host}/{ZILLOW_DB}"),
        })
    }
}

/// Everything a full acquire → prepare → split → model run needs.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache_path: PathBuf,
    pub use_cache: bool,
    pub prepare: PrepareConfig,
    pub split: SplitConfig,
    pub model: ModelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from(ZILLOW_FILE),
            use_cache: true,
            prepare: PrepareConfig::default(),
            split: SplitConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by `ZILLOW_CACHE` and `ZILLOW_USE_CACHE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("ZILLOW_CACHE") {
            config.cache_path = PathBuf::from(path);
        }
        if let Ok(flag) = std::env::var("ZILLOW_USE_CACHE") {
            config.use_cache = !matches!(flag.to_ascii_lowercase().as_str(), "0" | "false" | "no");
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepared_target_follows_renames() {
        let config = PrepareConfig::default();
        assert_eq!(config.prepared_target(), "property_tax_assessed_values");
        assert_eq!(config.renamed("yearbuilt"), "yearbuilt");
    }

    #[test]
    fn test_model_config_matches_prepared_names() {
        let prepare = PrepareConfig::default();
        let model = ModelConfig::default();
        assert_eq!(model.target, prepare.prepared_target());
        assert!(model
            .subgroups
            .iter()
            .all(|g| g.indicator.starts_with(&prepare.one_hot_prefix)));
    }

    #[test]
    fn test_split_defaults() {
        let split = SplitConfig::default();
        assert_eq!(split.random_seed, 24);
        assert!(split.stratify.is_none());
    }
}
