//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for CityKML using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// CityKML - 3D city model export tool
#[derive(Parser, Debug)]
#[command(name = "citykml")]
#[command(version, about, long_about = None)]
#[command(author = "Atlas Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "citykml.toml", env = "CITYKML_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CITYKML_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export city objects from the city database
    Export(commands::export::ExportArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Compile a balloon template and list its statements
    CheckTemplate(commands::template::CheckTemplateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
