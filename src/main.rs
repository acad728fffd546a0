//! screenpilot command-line entry point
//!
//! Loads configuration, binds the selected display and runs one of the
//! subcommands. Logs go to stderr so stdout stays machine readable.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use screenpilot::config::Config;
use screenpilot::dispatch::{ActionRequest, ActionResult};
use screenpilot::tool::{self, ComputerTool};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Error loading configuration")?;
    let config = cli::apply_overrides(&cli, config);

    match &cli.command {
        Commands::Displays => list_displays(&config).await,
        Commands::Options => {
            let tool = ComputerTool::from_config(&config).await?;
            println!("{}", serde_json::to_string_pretty(&tool.params())?);
            Ok(())
        }
        Commands::Act {
            request,
            inline_image,
        } => {
            let request: ActionRequest =
                serde_json::from_str(request).context("Invalid action request")?;
            let mut tool = ComputerTool::from_config(&config).await?;
            let result = tool.call(&request).await;
            print_result(&tool, result, *inline_image).await
        }
        Commands::Serve => serve(&config).await,
        Commands::Shell {
            command,
            no_screenshot,
        } => {
            let mut tool = ComputerTool::from_config(&config).await?;
            let result = tool.shell(command, !no_screenshot).await?;
            print_result(&tool, result, false).await
        }
    }
}

async fn list_displays(config: &Config) -> Result<()> {
    let catalog = tool::list_displays(config)
        .await
        .context("Failed to enumerate displays")?;

    for display in &catalog.displays {
        let marker = if display.index == catalog.primary_index {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, display);
    }
    Ok(())
}

/// Print a result as JSON, swapping the inline image for a saved file path
async fn print_result(tool: &ComputerTool, mut result: ActionResult, inline_image: bool) -> Result<()> {
    if !inline_image {
        if let Some(path) = tool.save_image(&result).await? {
            result.base64_image = None;
            result.system = Some(format!("Screenshot saved to {}", path.display()));
        }
    }
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

/// Answer JSON requests from stdin until it closes
async fn serve(config: &Config) -> Result<()> {
    let mut tool = ComputerTool::from_config(config).await?;
    tracing::info!("Serving {:?}", tool.options());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let result = match serde_json::from_str::<ActionRequest>(&line) {
            Ok(request) => tool.call(&request).await,
            Err(e) => ActionResult::error(format!("Invalid action request: {}", e)),
        };

        let mut encoded = serde_json::to_vec(&result)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
