//! SimClimat Parity - suite entry point
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌─────────────┐    ┌──────────────┐
//! │  Config  │───▶│ Reconciler + │───▶│ SuiteRunner │───▶│  PASS / FAIL │
//! │  (YAML)  │    │   engines    │    │ (sequential)│    │   + summary  │
//! └──────────┘    └──────────────┘    └─────────────┘    └──────────────┘
//! ```
//!
//! Flags:
//! - `--env <name>`       config file `config/<name>.yaml` (default `dev`)
//! - `--scenario <name>`  run only this scenario (repeatable)
//! - `--list`             print scenario names and exit
//! - `--horizon <years>`  override every scenario's horizon
//! - `--dump <name>`      print the candidate's raw result for one scenario

use anyhow::{Context, Result, bail};

use simclimat_parity::adapters::AsyncExecutable;
use simclimat_parity::config::HarnessConfig;
use simclimat_parity::logging::init_logging;
use simclimat_parity::runner::with_bundled_engines;
use simclimat_parity::scenario::{Scenario, default_suite};

// ============================================================
// ARGUMENTS
// ============================================================

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn get_values(flag: &str) -> Vec<String> {
    let args: Vec<String> = std::env::args().collect();
    let mut values = Vec::new();
    for i in 0..args.len() {
        if args[i] == flag && i + 1 < args.len() {
            values.push(args[i + 1].clone());
        }
    }
    values
}

fn get_horizon_override() -> Result<Option<f64>> {
    match get_values("--horizon").pop() {
        None => Ok(None),
        Some(raw) => {
            let years: f64 = raw
                .parse()
                .with_context(|| format!("--horizon expects a number of years, got {:?}", raw))?;
            Ok(Some(years))
        }
    }
}

fn use_list_mode() -> bool {
    std::env::args().any(|a| a == "--list")
}

fn select_scenarios(suite: Vec<Scenario>, names: &[String]) -> Result<Vec<Scenario>> {
    if names.is_empty() {
        return Ok(suite);
    }
    for name in names {
        if !suite.iter().any(|s| &s.name == name) {
            bail!("unknown scenario {:?} (see --list)", name);
        }
    }
    Ok(suite
        .into_iter()
        .filter(|s| names.contains(&s.name))
        .collect())
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let suite = default_suite();

    if use_list_mode() {
        for scenario in &suite {
            println!("{}", scenario.name);
        }
        return Ok(());
    }

    let env = get_env();
    let mut config =
        HarnessConfig::load(&env).with_context(|| format!("loading config for env {}", env))?;
    if let Some(years) = get_horizon_override()? {
        config.suite.horizon_years = Some(years);
        config.validate()?;
    }
    let log_guard = init_logging(&config);

    tracing::info!("Starting simclimat_parity in {} mode", env);

    let (runner, engine) = with_bundled_engines(&config.suite)?;

    if let Some(name) = get_values("--dump").pop() {
        let scenario = select_scenarios(suite, std::slice::from_ref(&name))?
            .pop()
            .context("scenario vanished after selection")?;
        let configuration = scenario.configuration()?;
        let years = config.suite.horizon_years.unwrap_or(scenario.horizon_years);
        let result = runner.candidate().execute(&configuration, years).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        engine.shutdown().await;
        return Ok(());
    }

    let scenarios = select_scenarios(suite, &get_values("--scenario"))?;
    let report = runner.run(&scenarios).await;
    engine.shutdown().await;

    for scenario in &report.scenarios {
        println!("{}", scenario);
    }
    println!("{}", report.summary());

    if !report.all_passed() {
        // exit() skips destructors: flush the file appender first
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}
