use clap::{Parser, Subcommand};
use mediaflow_runner::config::RunnerConfig;
use mediaflow_runner::error::RunnerError;
use mediaflow_runner::run;
use rootcause::Report;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// mediaflow - executes media-processing workflow runs
#[derive(Parser)]
#[command(name = "mediaflow-runner")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a trigger event file and print the run
    Run {
        /// Path to the trigger event (JSON)
        trigger: PathBuf,
    },
    /// List the built-in plugins
    Plugins,
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Report<RunnerError>> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| RunnerError::Output {
        details: e.to_string(),
    })?;
    println!("{rendered}");
    Ok(())
}

async fn dispatch(cli: Cli, config: RunnerConfig) -> Result<ExitCode, Report<RunnerError>> {
    match cli.command {
        Commands::Run { trigger } => {
            let event = run::load_trigger(&trigger).await?;
            let report = run::execute(&config, &event).await?;
            print_json(&report)?;
            Ok(if report.failed() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Plugins => {
            print_json(&run::descriptors(&config)?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match RunnerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let report: Report<RunnerError> = RunnerError::Config {
                details: e.to_string(),
            }
            .into();
            eprintln!("{report}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    tracing::debug!(?config, "loaded configuration");

    match dispatch(cli, config).await {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report}");
            ExitCode::FAILURE
        }
    }
}
