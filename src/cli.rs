//! Command-line interface definition and argument parsing
//!
//! This module uses clap to define and parse command-line arguments.

use clap::{Parser, Subcommand};
use screenpilot::config::{parse_bool, Config};
use screenpilot::display::DisplaySelector;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for screenpilot
#[derive(Parser, Debug)]
#[command(
    name = "screenpilot",
    about = "Drive a monitor or Android device through a computer-use action interface",
    version,
    long_about = "screenpilot maps agent actions in a standard logical resolution onto a native monitor or an ADB-attached Android device."
)]
pub struct Cli {
    /// Display to bind: primary, a catalog index, or serial:<device>
    #[arg(long, global = true)]
    pub display: Option<DisplaySelector>,

    /// Enable or disable coordinate scaling
    #[arg(long, global = true, value_parser = parse_bool_arg)]
    pub scaling: Option<bool>,

    /// Delay in milliseconds before the screenshot after a shell command
    #[arg(long, global = true)]
    pub screenshot_delay_ms: Option<u64>,

    /// Pause in milliseconds between groups of typed characters
    #[arg(long, global = true)]
    pub typing_delay_ms: Option<u64>,

    /// ADB server address
    #[arg(long, global = true)]
    pub adb_addr: Option<String>,

    /// Directory for saved screenshots
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for screenpilot
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every display that could be bound
    Displays,

    /// Print the tool options for the selected display
    Options,

    /// Execute one action given as JSON
    Act {
        /// Request such as {"action":"mouse_move","coordinate":[100,200]}
        request: String,

        /// Print the screenshot inline as base64 instead of saving it
        #[arg(long)]
        inline_image: bool,
    },

    /// Read JSON requests from stdin, one per line, and answer each on stdout
    Serve,

    /// Run a shell command and capture the screen afterwards
    Shell {
        /// Command line passed to the system shell
        command: String,

        /// Skip the screenshot
        #[arg(long)]
        no_screenshot: bool,
    },
}

fn parse_bool_arg(arg: &str) -> Result<bool, String> {
    parse_bool(arg).ok_or_else(|| format!("expected true or false, got '{}'", arg))
}

/// Apply command-line overrides on top of the environment configuration
pub fn apply_overrides(cli: &Cli, mut config: Config) -> Config {
    if let Some(display) = &cli.display {
        config.display = display.clone();
    }
    if let Some(scaling) = cli.scaling {
        config.scaling_enabled = scaling;
    }
    if let Some(delay) = cli.screenshot_delay_ms {
        config.screenshot_delay = Duration::from_millis(delay);
    }
    if let Some(delay) = cli.typing_delay_ms {
        config.typing_delay = Duration::from_millis(delay);
    }
    if let Some(addr) = &cli.adb_addr {
        config.adb_addr = addr.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    config
}
