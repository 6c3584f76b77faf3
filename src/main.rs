use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pixelhost::mime;
use pixelhost::models::{format_file_size, Config, SelectedFile, StrategyKind, TokenStatus};
use pixelhost::workflow::{Workflow, WorkflowEvent};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "pixelhost")]
#[command(about = "Publish images to GitHub and print a shareable URL")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload an image file.
    Upload {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Override UPLOAD_STRATEGY (`issue` or `release`).
        #[arg(long, value_parser = parse_strategy_arg)]
        strategy: Option<StrategyKind>,
    },
    /// Manage the stored GitHub token.
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Print the number of successful uploads.
    Stats,
}

#[derive(Debug, Subcommand)]
enum TokenAction {
    /// Store a token (obfuscated) for later uploads.
    Set { token: String },
    /// Check the current token against the GitHub API.
    Test,
    /// Remove the stored token.
    Clear,
}

fn parse_strategy_arg(input: &str) -> std::result::Result<StrategyKind, String> {
    input
        .parse::<StrategyKind>()
        .map_err(|e| e.to_string())
}

async fn read_selected_file(path: &Path) -> Result<SelectedFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_string();
    let media_type = mime::media_type_for(&bytes);

    info!("Read {} ({})", name, format_file_size(bytes.len() as u64));
    Ok(SelectedFile::new(name, media_type, bytes))
}

fn log_events(workflow: &Workflow) {
    let mut events = workflow.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(WorkflowEvent::StateChanged(state)) => debug!("State: {}", state),
                Ok(WorkflowEvent::TokenStatusChanged(status)) => {
                    debug!("Token status: {:?}", status)
                }
                Ok(WorkflowEvent::Completed(result)) => debug!("Completed: {}", result.url),
                Ok(WorkflowEvent::Failed(message)) => debug!("Failed: {}", message),
                Err(RecvError::Lagged(skipped)) => debug!("Skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn run(command: Command, mut config: Config) -> Result<()> {
    if let Command::Upload {
        strategy: Some(strategy),
        ..
    } = &command
    {
        config.strategy = *strategy;
    }

    let workflow = Workflow::from_config(&config)?;
    log_events(&workflow);

    match command {
        Command::Upload { path, .. } => {
            let file = read_selected_file(&path).await?;
            workflow.handle_file_selected(file)?;
            let result = workflow.upload().await?;

            println!("{}", result.url);
            println!("{}", result.markdown);
            info!("Total uploads: {}", workflow.upload_count());
        }
        Command::Token { action } => match action {
            TokenAction::Set { token } => {
                workflow.set_credential(&token);
                println!("Token saved");
            }
            TokenAction::Test => match workflow.test_credential().await {
                TokenStatus::Valid => println!("Token valid"),
                _ => anyhow::bail!("Token is not valid. Check the token and its permissions"),
            },
            TokenAction::Clear => {
                workflow.clear_credential();
                println!("Token cleared");
            }
        },
        Command::Stats => println!("{}", workflow.upload_count()),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixelhost=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting pixelhost");

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    match run(args.command, config).await {
        Ok(()) => {
            info!("pixelhost completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
