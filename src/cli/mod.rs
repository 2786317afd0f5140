//! CLI command definitions and handlers

mod init;
mod watch;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};

use crate::config::{load_project_config, ProjectConfig};
use crate::models::AnalysisResults;
use crate::pipeline::AnalysisPipeline;
use crate::scoring::{HealthScore, Scorer};

/// Drift - multi-language codebase health
#[derive(Parser, Debug)]
#[command(name = "drift")]
#[command(
    version,
    about = "Codebase health scoring: complexity, dependency freshness, import boundaries and dead code",
    after_help = "\
Examples:
  drift . snapshot                   Full analysis as JSON
  drift . check --fail-under 80      Exit 1 when the score drops below 80
  drift . init                       Write a starter drift.toml
  drift . watch --incremental        Re-score changed files as you save

Supported languages: Go, Python, TypeScript/JavaScript, Rust, Java, C#, Ruby, PHP"
)]
pub struct Cli {
    /// Path to repository (default: current directory)
    #[arg(global = true, default_value = ".")]
    pub path: PathBuf,

    /// Config file to use instead of drift.toml discovery
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full analysis and print results and score as JSON
    Snapshot,

    /// Print the health score and fail when it is below a threshold
    Check {
        /// Minimum acceptable score (default: thresholds.min_score)
        #[arg(long)]
        fail_under: Option<f64>,
    },

    /// Write a drift.toml with default settings
    Init,

    /// Watch for changes and re-score on every save
    Watch {
        /// Only recompute complexity of the changed file
        #[arg(long)]
        incremental: bool,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => init::run(&cli.path),
        Commands::Snapshot => snapshot(load_config(&cli)?),
        Commands::Check { fail_under } => check(load_config(&cli)?, fail_under),
        Commands::Watch { incremental } => watch::run(load_config(&cli)?, incremental),
    }
}

fn load_config(cli: &Cli) -> Result<ProjectConfig> {
    let repo_path = cli
        .path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", cli.path.display()))?;
    load_project_config(&repo_path, cli.config.as_deref())
        .context("Failed to load project configuration")
}

fn analyze(config: ProjectConfig) -> Result<(AnalysisResults, HealthScore)> {
    let mut scorer = Scorer::from_config(&config);
    let pipeline = AnalysisPipeline::new(config);
    let results = pipeline.run()?;
    let score = scorer.calculate(&results);
    Ok((results, score))
}

fn snapshot(config: ProjectConfig) -> Result<()> {
    let (results, score) = analyze(config)?;
    let out = serde_json::json!({
        "results": results,
        "score": score,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn check(config: ProjectConfig, fail_under: Option<f64>) -> Result<()> {
    let threshold = fail_under.unwrap_or(config.thresholds.min_score);
    let root = config.root.clone();
    let (results, score) = analyze(config)?;

    print_summary(&root, &results, &score);

    if score.total < threshold {
        println!(
            "\n{} Score {:.1} is below {:.1}",
            style("✗").red(),
            score.total,
            threshold
        );
        std::process::exit(1);
    }
    println!(
        "\n{} Score {:.1} meets {:.1}",
        style("✓").green(),
        score.total,
        threshold
    );
    Ok(())
}

fn print_summary(root: &Path, results: &AnalysisResults, score: &HealthScore) {
    println!(
        "\n{} {} ({}, {} files, {} functions)\n",
        style("Health").bold(),
        style(root.display()).cyan(),
        results.language,
        results.file_count,
        results.function_count
    );
    println!("  {:<12} {}", "Total", style(format!("{:.1}", score.total)).bold());
    for (label, value, detail) in [
        ("Complexity", score.complexity, format!("{} functions", results.complexity.len())),
        ("Deps", score.deps, format!("{} dependencies", results.dependencies.len())),
        ("Boundaries", score.boundaries, format!("{} violations", results.violations.len())),
        ("Dead code", score.dead_code, format!("{} unreferenced", results.dead_code.len())),
        ("Coverage", score.coverage, String::new()),
    ] {
        println!("  {:<12} {:>5.1}  {}", label, value, style(detail).dim());
    }
}
