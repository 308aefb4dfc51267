//! library-runner: headless driver for the long-horizon path library.
//!
//! Usage:
//!   library-runner calibrate --db library.db [--config data/engine_config.json]
//!   library-runner build --db library.db --size 100000
//!   library-runner report --mu 0.088 --sigma 0.151 --kappa 1.32 --paths 100 [--json]
//!   library-runner scenarios --db library.db

use anyhow::{bail, Result};
use longpath_core::{
    catalog::TableCatalog,
    report::{run_report, SimulationReport, DEFAULT_REPORT_PATHS},
    store::{LibraryStore, ParameterTable},
    CalibratedParameters, Calibrator, EngineConfig, FinalStatisticsRow, LibraryBuilder,
    ScenarioTarget,
};
use std::env;

#[derive(serde::Serialize)]
struct LibrarySummary {
    scenarios: usize,
    rows: usize,
    mean_annual_return: f64,
    worst_drawdown: f64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    let db = str_arg(&args, "--db", "library.db");
    let json = args.iter().any(|a| a == "--json");

    let mut config = match args.windows(2).find(|w| w[0] == "--config") {
        Some(w) => EngineConfig::load(&w[1])?,
        None => EngineConfig::default(),
    };
    config.master_seed = parse_arg(&args, "--seed", config.master_seed);
    log::info!("{command}: seed {} horizon {} years", config.master_seed, config.horizon_years);

    match command {
        "calibrate" => {
            let mut store = LibraryStore::open(db)?;
            store.migrate()?;
            let grid = ScenarioTarget::default_grid();
            println!("calibrating {} scenarios into {db}", grid.len());

            let entries = Calibrator::new(config)?.calibrate(&grid, &mut store)?;
            let converged = entries.iter().filter(|e| e.converged).count();
            log::info!("calibrate: {} rows in {db}", entries.len());
            println!("parameter table: {} rows ({converged} converged)", entries.len());
        }
        "build" => {
            let size = parse_arg(&args, "--size", 100_000usize);
            let mut store = LibraryStore::open(db)?;
            store.migrate()?;
            let entries = store.entries()?;
            if entries.is_empty() {
                bail!("no calibrated parameters in {db}; run `calibrate` first");
            }
            println!("building library of ~{size} paths over {} scenarios", entries.len());

            let rows = LibraryBuilder::new(config)?.generate_library(&entries, size, &mut store)?;
            log::info!("build: {} rows in {db}", rows.len());
            print_library_summary(&rows, json)?;
        }
        "report" => {
            let calibrated = CalibratedParameters::new(
                parse_arg(&args, "--mu", 0.088),
                parse_arg(&args, "--sigma", 0.151),
                parse_arg(&args, "--kappa", 1.32),
            );
            let n_paths = parse_arg(&args, "--paths", DEFAULT_REPORT_PATHS);
            let params = config.process_parameters(calibrated);
            let report = run_report(&config, params, n_paths)?;
            log::info!("report: {n_paths} paths simulated");
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        "scenarios" => {
            let catalog = TableCatalog::open(db)?;
            log::info!("scenarios: reading {db}");
            for target in catalog.available_scenarios()? {
                let rows = catalog.scenario_rows(&target)?;
                println!(
                    "mean {:>6.2}%  spread {:>5.2}  paths {:>6}",
                    target.mean * 100.0,
                    target.spread,
                    rows.len()
                );
            }
        }
        _ => {
            if command != "help" {
                log::warn!("Unknown command: {command}");
            }
            println!("library-runner <calibrate|build|report|scenarios> [--db PATH] [--config PATH] [--seed N]");
            println!("  build:  --size N");
            println!("  report: --mu X --sigma X --kappa X --paths N [--json]");
        }
    }

    Ok(())
}

fn print_library_summary(rows: &[FinalStatisticsRow], json: bool) -> Result<()> {
    let mut scenarios: Vec<ScenarioTarget> = Vec::new();
    for row in rows {
        if !scenarios.iter().any(|t| t.matches(&row.target)) {
            scenarios.push(row.target);
        }
    }
    let summary = LibrarySummary {
        scenarios: scenarios.len(),
        rows: rows.len(),
        mean_annual_return: if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|r| r.actual_annual_return).sum::<f64>() / rows.len() as f64
        },
        worst_drawdown: rows.iter().map(|r| r.max_drop).fold(0.0, f64::max),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("=== Library Summary ===");
    println!("  scenarios:          {}", summary.scenarios);
    println!("  rows:               {}", summary.rows);
    println!("  mean annual return: {:.2}%", summary.mean_annual_return * 100.0);
    println!("  worst drawdown:     {:.2}%", summary.worst_drawdown * 100.0);
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("=== Simulation Dashboard ===");
    println!("Averaged over {} paths:", report.n_paths);
    println!();
    println!(
        "{:<27}{:.2}% (min {:.2}%, max {:.2}%)",
        "Annual return:",
        report.annualized_return * 100.0,
        report.min_return * 100.0,
        report.max_return * 100.0
    );
    println!("{:<27}{:.2}%", "Annualized std dev:", report.annualized_volatility * 100.0);
    println!("{:<27}{:.2}%", "Maximum drawdown:", report.max_drawdown * 100.0);
    println!("{:<27}{:.2}%", "Max daily drop:", report.max_daily_drop * 100.0);
    println!("{}", "-".repeat(40));
    println!("{:<27}{:.2}", "Avg. lost years:", report.lost_years);
    println!("{:<27}{:.2}", "Avg. lost 5-year periods:", report.lost_five_year_periods);
    println!("{:<27}{:.2}", "Avg. lost decades:", report.lost_decades);

    if report.envelope.is_empty() {
        return;
    }
    println!();
    println!("=== Price Envelope (from year 10) ===");
    println!("{:>5} {:>12} {:>12} {:>12}", "Year", "P5", "Mean", "P95");
    for row in &report.envelope {
        println!("{:>5} {:>12.2} {:>12.2} {:>12.2}", row.year, row.p05, row.mean, row.p95);
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}
