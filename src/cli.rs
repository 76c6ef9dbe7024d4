use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "safescan")]
#[command(about = "Check QR codes against a remote risk analysis service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the analysis service (overrides config and SAFESCAN_API_URL)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Print the report as JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload an image containing a QR code
    Scan {
        /// Image file (png, jpg, jpeg, gif)
        image: PathBuf,
    },

    /// Analyze an already decoded QR payload
    Analyze {
        /// Decoded text, usually a URL
        payload: String,
    },

    /// Read QR codes from the camera scanner until one is analyzed
    Camera {
        /// Read decoded payloads from stdin, one per line, instead of
        /// starting the configured scanner command
        #[arg(long)]
        stdin: bool,
    },

    /// Write the current configuration to the config file
    InitConfig,
}
