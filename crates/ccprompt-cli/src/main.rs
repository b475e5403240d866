mod config;
mod output;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use ccprompt_core::{extract_with_options, ExtractOptions, IndexOptions, Language};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{load_or_create, merge, Overrides, DEFAULT_CONFIG_FILE};
use crate::output::{render, write_output, OutputFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "ccprompt", version)]
#[command(about = "Extract code context for AI prompts based on a function or class name.")]
struct Cli {
    /// Path to the configuration JSON file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the project path from the configuration file
    #[arg(long, alias = "project_path")]
    project_path: Option<PathBuf>,

    /// Override the function or class names from the configuration file
    #[arg(long, alias = "target_names", num_args = 1..)]
    target_names: Vec<String>,

    /// Exclude the virtual environment site-packages directory from the search
    #[arg(long, alias = "exclude_venv")]
    exclude_venv: bool,

    /// Output file for the extracted code
    #[arg(long, alias = "output_file")]
    output_file: Option<PathBuf>,

    /// Programming language of the project
    #[arg(long, value_parser = ["python", "javascript"])]
    language: Option<String>,

    #[arg(long, alias = "log_level", value_enum, ignore_case = true, default_value = "WARNING")]
    log_level: LogLevel,

    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Skip files excluded by .gitignore and .ignore rules
    #[arg(long)]
    respect_ignore: bool,
}

fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let file_config = load_or_create(&cli.config)?;
    let overrides = Overrides {
        project_path: cli.project_path,
        target_names: cli.target_names,
        exclude_venv: cli.exclude_venv,
        output_file: cli.output_file,
        language: cli.language,
    };
    let run_config = merge(file_config, overrides, &cli.config)?;

    let language = Language::from_tag(&run_config.language)?;
    let mut index_options = IndexOptions::default();
    index_options.respect_ignore_files |= cli.respect_ignore;
    let options = ExtractOptions {
        language,
        index: index_options,
    };

    let report = extract_with_options(
        &run_config.target_names,
        &run_config.search_paths(),
        &options,
    )?;
    let content = render(&report, cli.format)?;
    write_output(&run_config.output_file, &content)?;
    info!(
        "Relevant code extracted to {}",
        run_config.output_file.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let started = Instant::now();
    let result = run(cli);
    info!(
        "Time taken for process: {:.2} seconds",
        started.elapsed().as_secs_f64()
    );
    result
}
