use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use frontier_mutations::replay::{ReplayScript, ReplaySession};
use frontier_mutations::RuntimeConfig;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let script_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: frontier-mutations <script.yaml|script.json>")?;

    let config_path = std::env::var("FRONTIER_MUTATIONS_CONFIG")
        .ok()
        .map(PathBuf::from);
    let config = RuntimeConfig::load(config_path).unwrap_or_else(|err| {
        eprintln!("Failed to load runtime configuration: {err}. Using defaults.");
        RuntimeConfig::default()
    });

    // tracing may already be initialised; continue silently
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    let contents = std::fs::read_to_string(&script_path)
        .with_context(|| format!("failed to read {}", script_path.display()))?;
    let script = ReplayScript::parse(&contents)?;
    let outcome = ReplaySession::new(&config)
        .run(&script)
        .with_context(|| format!("failed to replay {}", script_path.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for delivery in &outcome.deliveries {
        serde_json::to_writer(&mut out, delivery)?;
        writeln!(out)?;
    }
    serde_json::to_writer(&mut out, &outcome.summary)?;
    writeln!(out)?;
    Ok(())
}
