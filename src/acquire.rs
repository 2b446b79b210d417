//! Acquisition of the raw Zillow data from MySQL or a local CSV cache.

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{info, warn};

use crate::config::{Config, DatabaseConfig};
use crate::error::{ZillowError, ZillowResult};
use crate::prepare::{prepare_data, split_data};

/// Anything that can answer a SQL query with a data frame.
pub trait SqlSource {
    fn query(&self, sql: &str) -> ZillowResult<DataFrame>;
}

/// [`SqlSource`] backed by a single-connection MySQL pool.
///
/// The pool lives on an owned current-thread runtime so callers stay
/// synchronous.
pub struct MySqlSource {
    runtime: tokio::runtime::Runtime,
    pool: MySqlPool,
}

impl MySqlSource {
    pub fn connect(config: &DatabaseConfig) -> ZillowResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        // We should only ever need 1 connection
        let pool = runtime
            .block_on(
                MySqlPoolOptions::new()
                    .min_connections(1)
                    .max_connections(1)
                    .connect(&config.database_url),
            )
            .map_err(|e| ZillowError::DataUnavailable(format!("could not connect to db: {e}")))?;

        Ok(Self { runtime, pool })
    }
}

impl SqlSource for MySqlSource {
    fn query(&self, sql: &str) -> ZillowResult<DataFrame> {
        let rows = self
            .runtime
            .block_on(sqlx::query(sql).fetch_all(&self.pool))
            .map_err(|e| ZillowError::DataUnavailable(format!("query failed: {e}")))?;
        info!(rows = rows.len(), "fetched rows from mysql");
        rows_to_frame(&rows)
    }
}

/// [`SqlSource`] that reads [`DatabaseConfig`] from the environment and
/// connects only when a query is made, so a cache hit needs no credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvMySqlSource;

impl SqlSource for EnvMySqlSource {
    fn query(&self, sql: &str) -> ZillowResult<DataFrame> {
        let database = DatabaseConfig::from_env()?;
        MySqlSource::connect(&database)?.query(sql)
    }
}

fn schema_error(column: &str, reason: impl ToString) -> ZillowError {
    ZillowError::SchemaMismatch {
        column: column.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses a numeric value that the driver handed back as text.
pub(crate) fn parse_numeric(column: &str, text: &str) -> ZillowResult<f64> {
    text.trim()
        .parse()
        .map_err(|e| schema_error(column, format!("{text:?} is not numeric: {e}")))
}

fn numeric_cell(row: &MySqlRow, idx: usize) -> ZillowResult<Option<f64>> {
    let name = row.column(idx).name();
    if row.try_get_raw(idx).map_err(|e| schema_error(name, e))?.is_null() {
        return Ok(None);
    }

    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return Ok(Some(v));
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Ok(Some(v as f64));
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return Ok(Some(v as f64));
    }
    let text = row.try_get::<String, _>(idx).map_err(|e| schema_error(name, e))?;
    parse_numeric(name, &text).map(Some)
}

fn rows_to_frame(rows: &[MySqlRow]) -> ZillowResult<DataFrame> {
    let Some(first) = rows.first() else {
        return Err(ZillowError::DataUnavailable("query returned no rows".into()));
    };

    let mut columns = Vec::with_capacity(first.columns().len());
    for column in first.columns() {
        let idx = column.ordinal();
        let type_name = column.type_info().name();

        let series = if type_name.contains("CHAR") || type_name.contains("TEXT") {
            let values = rows
                .iter()
                .map(|row| row.try_get::<Option<String>, _>(idx))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| schema_error(column.name(), e))?;
            Series::new(column.name(), values)
        } else {
            let values = rows
                .iter()
                .map(|row| numeric_cell(row, idx))
                .collect::<ZillowResult<Vec<_>>>()?;
            Series::new(column.name(), values)
        };
        columns.push(series);
    }

    Ok(DataFrame::new(columns)?)
}

/// Flat CSV copy of the last query result.
#[derive(Debug, Clone)]
pub struct CsvCache {
    path: PathBuf,
}

impl CsvCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn read(&self) -> ZillowResult<DataFrame> {
        let df = CsvReader::from_path(self.path.clone())?
            .has_header(true)
            // sparse columns are mostly empty in the first rows
            .infer_schema(None)
            .finish()?;
        info!(path = %self.path.display(), rows = df.height(), columns = df.width(), "read cache");
        Ok(df)
    }

    /// Writes `df` with a header row and no index column, replacing any
    /// previous file.
    pub fn write(&self, df: &mut DataFrame) -> ZillowResult<()> {
        let mut file = File::create(&self.path)?;
        CsvWriter::new(&mut file).finish(df)?;
        info!(path = %self.path.display(), rows = df.height(), "wrote cache");
        Ok(())
    }
}

/// Reads the cached data when allowed and present, otherwise queries the
/// source and refreshes the cache.
pub fn get_data<S: SqlSource + ?Sized>(
    source: &S,
    cache: &CsvCache,
    use_cache: bool,
) -> ZillowResult<DataFrame> {
    if use_cache && cache.exists() {
        return cache.read();
    }
    if use_cache {
        warn!(path = %cache.path().display(), "cache missing, querying source");
    }

    let mut df = source.query(&zillow_sql())?;
    cache.write(&mut df)?;
    Ok(df)
}

/// Acquires, prepares and splits the data into train, validate and test.
pub fn wrangle<S: SqlSource + ?Sized>(
    source: &S,
    config: &Config,
) -> ZillowResult<(DataFrame, DataFrame, DataFrame)> {
    let cache = CsvCache::new(&config.cache_path);
    let raw = get_data(source, &cache, config.use_cache)?;
    let prepared = prepare_data(&raw, &config.prepare)?;
    split_data(&prepared, &config.split)
}

/// Single family residential properties from the 2017 tables.
pub fn zillow_sql() -> String {
    r#"
        SELECT
            parcelid,
            bedroomcnt,
            bathroomcnt,
            calculatedfinishedsquarefeet,
            taxvaluedollarcnt,
            yearbuilt,
            fips,
            numberofstories,
            basementsqft,
            fireplacecnt,
            heatingorsystemdesc,
            airconditioningdesc,
            roomcnt,
            garagetotalsqft,
            hashottuborspa,
            poolcnt,
            poolsizesum,
            yardbuildingsqft17,
            buildingqualitytypeid,
            lotsizesquarefeet,
            finishedfloor1squarefeet,
            finishedsquarefeet15
        FROM properties_2017
        JOIN propertylandusetype
            ON propertylandusetype.propertylandusetypeid = properties_2017.propertylandusetypeid
            AND propertylandusetype.propertylandusedesc IN ('Single Family Residential', 'Inferred Single Family Residential')
        LEFT JOIN heatingorsystemtype USING (heatingorsystemtypeid)
        LEFT JOIN airconditioningtype USING (airconditioningtypeid);
    "#
    .to_string()
}
