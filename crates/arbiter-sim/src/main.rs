//! Arbiter simulation entry point.
//!
//! Reads `ARBITER_SCENARIO` (required), `ARBITER_CONTENT` and `ARBITER_SEED`
//! (optional) plus the engine settings, then prints one JSON line per
//! journal event followed by one per actor. Logs go to stderr.

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

use arbiter_core::config::EngineConfig;
use arbiter_core::rng::{DeterministicRng, SystemRng};
use arbiter_sim::error::SimError;
use arbiter_sim::runner::{
    CONTENT_KEY, SCENARIO_KEY, SEED_KEY, load_templates, parse_seed, run_scenario,
};
use arbiter_sim::scenario::Scenario;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Arbiter simulation");

    // Read configuration from environment.
    let config = EngineConfig::from_env()?;
    let scenario_path = std::env::var(SCENARIO_KEY)
        .map(PathBuf::from)
        .map_err(|_| SimError::MissingEnv(SCENARIO_KEY))?;
    let content_path = std::env::var(CONTENT_KEY).ok().map(PathBuf::from);
    let rng: Box<dyn DeterministicRng> = match std::env::var(SEED_KEY) {
        Ok(raw) => Box::new(SystemRng::seeded(parse_seed(&raw)?)),
        Err(_) => Box::new(SystemRng::new()),
    };

    let templates = load_templates(content_path.as_deref())?;
    let scenario = Scenario::from_file(&scenario_path)?;
    let report = run_scenario(&scenario, templates, config, rng)?;

    let mut out = std::io::stdout().lock();
    for line in &report.journal {
        writeln!(out, "{}", serde_json::to_string(line)?)?;
    }
    for actor in &report.actors {
        writeln!(out, "{}", serde_json::to_string(actor)?)?;
    }

    Ok(())
}
