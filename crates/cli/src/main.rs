//! `navcharge` - verify vendor air-navigation charge invoices against
//! published reference tables.
//!
//! One TOML config per billing source describes the vendor file layout,
//! the reference tables and the charge formula; the engine does the rest.

mod exit_codes;
mod loader;
mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use navcharge_recon::SourceConfig;

use exit_codes::{EXIT_INVALID_CONFIG, EXIT_MISMATCHES, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};

/// A CLI failure: an exit code plus what to tell the operator.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Parser)]
#[command(name = "navcharge", version, about = "Air-navigation charge verification")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a billing source against its reference tables
    Run {
        /// Path to the source config (TOML)
        config: PathBuf,
        /// Print the full report as JSON instead of the summary
        #[arg(long)]
        json: bool,
        /// Write the line-level CSV report here (overrides the config)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Parse and validate a source config without reading data files
    Validate {
        /// Path to the source config (TOML)
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, json, output } => cmd_run(&config, json, output.as_deref()),
        Commands::Validate { config } => cmd_validate(&config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {}", e.message);
            if let Some(hint) = e.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(e.code)
        }
    }
}

fn load_config(path: &Path) -> Result<SourceConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_USAGE,
        message: format!("cannot read config {}: {e}", path.display()),
        hint: None,
    })?;
    SourceConfig::from_toml(&text).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: e.to_string(),
        hint: Some(format!("while loading {}", path.display())),
    })
}

fn cmd_run(config_path: &Path, json: bool, output: Option<&Path>) -> Result<u8, CliError> {
    let config = load_config(config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let input = loader::load_input(&config, base_dir)?;
    let recon_report = navcharge_recon::run(&config, &input).map_err(|e| CliError {
        code: EXIT_RUNTIME,
        message: e.to_string(),
        hint: None,
    })?;

    // CSV report: the --output flag wins over the config's output block.
    let csv_path = output
        .map(Path::to_path_buf)
        .or_else(|| config.output.csv.as_ref().map(|p| base_dir.join(p)));
    if let Some(path) = csv_path {
        let file = std::fs::File::create(&path).map_err(|e| CliError {
            code: EXIT_RUNTIME,
            message: format!("cannot create {}: {e}", path.display()),
            hint: None,
        })?;
        report::write_csv(&recon_report, file)?;
    }

    if let Some(json_name) = &config.output.json {
        let path = base_dir.join(json_name);
        let text = serde_json::to_string_pretty(&recon_report).map_err(|e| CliError {
            code: EXIT_RUNTIME,
            message: format!("cannot serialize report: {e}"),
            hint: None,
        })?;
        std::fs::write(&path, text).map_err(|e| CliError {
            code: EXIT_RUNTIME,
            message: format!("cannot write {}: {e}", path.display()),
            hint: None,
        })?;
    }

    if json {
        let text = serde_json::to_string_pretty(&recon_report).map_err(|e| CliError {
            code: EXIT_RUNTIME,
            message: format!("cannot serialize report: {e}"),
            hint: None,
        })?;
        println!("{text}");
    } else {
        report::print_summary(&recon_report);
    }

    if recon_report.summary.not_matched > 0 {
        Ok(EXIT_MISMATCHES)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

fn cmd_validate(config_path: &Path) -> Result<u8, CliError> {
    let config = load_config(config_path)?;
    println!(
        "ok: {} ({}, formula {})",
        config.name,
        config.airport,
        config.formula.kind_name()
    );
    Ok(EXIT_SUCCESS)
}
