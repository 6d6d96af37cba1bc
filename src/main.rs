use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subgen::{model, output, utils};
use subgen::{Cli, Config, Pipeline, SourceReference};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "subgen=debug"
    } else {
        "subgen=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // One diagnostic line per failed run.
            eprintln!("[ERROR] {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Credentials are checked before any pipeline stage runs.
    let config = Config::load()?;
    let source = model::decode_args(cli.url, cli.file)?;

    if matches!(source, SourceReference::Url(_)) {
        for dep in utils::check_dependencies(&config.yt_dlp_path).await {
            tracing::warn!("missing dependency: {dep}");
        }
    }

    let pipeline = Pipeline::new(&config)?;

    let progress = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );
        spinner.set_message(match &source {
            SourceReference::Url(_) => "Extracting and transcribing audio...",
            SourceReference::File(_) => "Transcribing audio...",
        });
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    };

    let result = pipeline.run(source).await;
    progress.finish_and_clear();

    output::print_result(&result?)?;
    Ok(())
}
