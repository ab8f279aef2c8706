use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for anaflow
#[derive(Parser, Debug)]
#[command(version, about = "anaflow")]
pub struct Args {
    /// Identifier of the dataset to open (required unless --init-config)
    pub dataset_id: Option<String>,

    /// Base URL of the AnalyticsFlow server (overrides config)
    #[arg(long = "server")]
    pub server: Option<String>,

    /// Path to the file holding the bearer token (overrides config)
    #[arg(long = "token-file")]
    pub token_file: Option<PathBuf>,

    /// Placeholder glyph for missing statistic values (overrides config)
    #[arg(long = "placeholder")]
    pub placeholder: Option<String>,

    /// Start with the chat panel open
    #[arg(long = "chat-open", action)]
    pub chat_open: bool,

    /// Enable debug mode to show operational information
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Write a default config file and exit
    #[arg(long = "init-config", action)]
    pub init_config: bool,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long = "force", action)]
    pub force: bool,
}
