//! GhostSync Simulator CLI
//!
//! Run deterministic ghost playback scenarios against a simulated runner.

use clap::Parser;
use ghostsync_core::GhostSyncConfig;
use ghostsync_sim::{ScenarioId, ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// GhostSync Deterministic Simulation CLI
#[derive(Parser, Debug)]
#[command(name = "ghostsync-sim")]
#[command(about = "Run deterministic ghost playback scenarios", long_about = None)]
struct Args {
    /// JSON configuration file (reader, producer, consumer)
    #[arg(short, long)]
    config: Option<String>,

    /// Simulated lag in seconds (overrides the config file)
    #[arg(short, long)]
    lag: Option<f64>,

    /// Ring buffer capacity (overrides the config file)
    #[arg(long)]
    capacity: Option<usize>,

    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of consecutive seeds to run
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    seeds: u64,

    /// Scenario to run (steady_run, lane_weave, hurdles, crash, time_lapse, jitter, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Simulated duration in seconds
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export truth and ghost frames to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides the --verbose level
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("GhostSync Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: steady_run, lane_weave, hurdles, crash, time_lapse, jitter, all");
            std::process::exit(1);
        })]
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }
        let scenario = scenarios[0];
        info!("Running with export to: {}", export_path);

        let runner = ScenarioRunner::new(base_seed)
            .with_duration(args.duration)
            .with_config(config);
        let outcome = runner
            .run_with_export(scenario, 6)
            .and_then(|(result, export)| {
                export.write_to_file(export_path)?;
                info!("Exported {} frames to {}", export.frames.len(), export_path);
                Ok(result)
            });

        match outcome {
            Ok(result) if result.passed => {
                info!("✓ {} (seed={}) PASSED - exported to {}", scenario.name(), base_seed, export_path);
            }
            Ok(result) => {
                error!(
                    "✗ {} FAILED: {}",
                    scenario.name(),
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
                std::process::exit(1);
            }
            Err(e) => {
                error!("✗ {} errored: {}", scenario.name(), e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Run simulations
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset);
        let runner = ScenarioRunner::new(seed)
            .with_duration(args.duration)
            .with_config(config.clone());

        for scenario in &scenarios {
            let result = match runner.run(*scenario) {
                Ok(result) => result,
                Err(e) => {
                    error!("✗ {} (seed={}) errored: {}", scenario.name(), seed, e);
                    failed_count += 1;
                    continue;
                }
            };

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }
            all_results.push(result);
        }
    }

    // Summary
    let total = args.seeds as usize * scenarios.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "frames": r.total_frames,
                    "time_secs": r.final_time_secs,
                    "rms_error": r.metrics.rms_error,
                    "stale_queries": r.metrics.query_stats.stale,
                    "crash_delays": r.metrics.crash_delays,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

/// Loads the config file (or defaults) and applies CLI overrides.
fn load_config(args: &Args) -> Result<GhostSyncConfig, ghostsync_core::SyncError> {
    let mut config = match &args.config {
        Some(path) => GhostSyncConfig::from_json_file(path)?,
        None => GhostSyncConfig::default(),
    };
    if let Some(lag) = args.lag {
        config.reader.simulated_lag = lag;
    }
    if let Some(capacity) = args.capacity {
        config.reader.capacity = capacity;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seeds_rejected() {
        assert!(Args::try_parse_from(["ghostsync-sim", "--seeds", "0"]).is_err());
        let args = Args::try_parse_from(["ghostsync-sim", "--seeds", "3"]).unwrap();
        assert_eq!(args.seeds, 3);
    }

    #[test]
    fn test_cli_overrides_config() {
        let args =
            Args::try_parse_from(["ghostsync-sim", "--lag", "0.4", "--capacity", "32"]).unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.reader.simulated_lag, 0.4);
        assert_eq!(config.reader.capacity, 32);
    }
}
