use std::process::ExitCode;

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gis_harvest::app::Harvester;
use gis_harvest::config::{ConfigLoader, ResolvedConfig};
use gis_harvest::credentials::EnvCredentials;
use gis_harvest::error::HarvestError;
use gis_harvest::output::{ConsoleOutput, JsonOutput, OutputMode};
use gis_harvest::portal::HttpPortalConnector;

#[derive(Parser)]
#[command(name = "gis-harvest")]
#[command(about = "Fetch and unpack monthly GIS dataset archives from an authenticated portal")]
#[command(version, author)]
struct Cli {
    /// Path to gis-harvest.json (defaults to ./gis-harvest.json, then the user config dir)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download and extract every configured dataset (default)")]
    Run,
    #[command(about = "Show the paths this month's run would use, without downloading")]
    Plan,
}

enum Outcome {
    Complete,
    JobsFailed,
}

fn main() -> ExitCode {
    match run() {
        Ok(Outcome::Complete) => ExitCode::SUCCESS,
        Ok(Outcome::JobsFailed) => ExitCode::from(3),
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<HarvestError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        HarvestError::MissingConfig
        | HarvestError::ConfigRead(_)
        | HarvestError::ConfigParse(_)
        | HarvestError::InvalidUrl(_)
        | HarvestError::InvalidResourceName(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<Outcome> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let resolved = ConfigLoader::resolve(cli.config.as_deref())?;
    if resolved.datasets.is_empty() {
        return Err(miette::Report::msg("no datasets configured"));
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_harvest(resolved, output_mode),
        Commands::Plan => run_plan(resolved, output_mode),
    }
}

fn build_harvester(resolved: &ResolvedConfig) -> Harvester<HttpPortalConnector, EnvCredentials> {
    Harvester::new(
        HttpPortalConnector::new(resolved.portal.timeout),
        resolved.credentials.clone(),
        resolved.portal.clone(),
        resolved.current_dir_name.clone(),
    )
}

fn run_harvest(resolved: ResolvedConfig, output_mode: OutputMode) -> miette::Result<Outcome> {
    let harvester = build_harvester(&resolved);
    let result = match output_mode {
        OutputMode::Json => {
            let result = harvester.run(&resolved.datasets, &JsonOutput);
            JsonOutput::print_harvest(&result).into_diagnostic()?;
            result
        }
        OutputMode::Human => {
            let result = harvester.run(&resolved.datasets, &ConsoleOutput);
            ConsoleOutput::print_harvest(&result);
            result
        }
    };

    if result.failed() > 0 {
        Ok(Outcome::JobsFailed)
    } else {
        Ok(Outcome::Complete)
    }
}

fn run_plan(resolved: ResolvedConfig, output_mode: OutputMode) -> miette::Result<Outcome> {
    let plan = build_harvester(&resolved).plan(&resolved.datasets);
    match output_mode {
        OutputMode::Json => JsonOutput::print_plan(&plan).into_diagnostic()?,
        OutputMode::Human => ConsoleOutput::print_plan(&plan),
    }
    Ok(Outcome::Complete)
}
