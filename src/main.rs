use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zillow_value_predictor::{
    explore::statistical_test, fit_per_subgroup_models, produce_models, wrangle, Config,
    EnvMySqlSource,
};

// Batch entry point
// Steps
// 1. Acquire (CSV cache or MySQL), prepare and split the data
// 2. Test feature correlation with the target
// 3. Score baseline and polynomial models
// 4. Score one model per county

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("starting zillow regression pipeline");
    let config = Config::from_env();

    // 1. Acquire, prepare and split
    let (train, validate, _test) =
        wrangle(&EnvMySqlSource, &config).context("could not wrangle zillow data")?;

    // 2. Correlation of each feature with the target, on train only
    for variable in ["square_feet", "bedroom_count", "bathroom_count", "amenities", "property_age"] {
        let result = statistical_test(&train, variable, &config.prepare)?;
        println!("{variable}\n{result}\n");
    }

    // 3. Baseline and polynomial models
    let results = produce_models(&train, &validate, &config.model)?;
    println!("{results}\n");

    // 4. Per county models
    let county_results =
        fit_per_subgroup_models(&train, &validate, &config.model.subgroups, &config.model)?;
    println!("{county_results}");

    Ok(())
}
