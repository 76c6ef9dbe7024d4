// `safescan` binary: checks QR codes against the analysis service, either
// from an image file, a decoded payload or a live camera feed. With no
// subcommand it opens the interactive menu. The process exit code carries
// the risk level of the last report.

use anyhow::Context;
use clap::Parser;
use safescan_cli::cli::{Cli, Commands};
use safescan_cli::session::Session;
use safescan_cli::ui::{self, Output};
use safescan_cli::{ApiClient, ClientConfig, Mode, ScanApi, ScanClient};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    // Base URL comes from the config file, SAFESCAN_API_URL or --server,
    // defaulting to http://127.0.0.1:5000. See `ClientConfig::resolve`.
    let config = ClientConfig::resolve(cli.server.as_deref());
    let api: Arc<dyn ScanApi> = Arc::new(ApiClient::new(config.clone())?);
    let output = if cli.json { Output::Json } else { Output::Pretty };

    let Some(command) = cli.command else {
        ui::main_menu(Session::new(api, Mode::Upload), &config)?;
        return Ok(ExitCode::SUCCESS);
    };

    let session = match command {
        Commands::Scan { image } => {
            let mut session = Session::new(api, Mode::Upload);
            ui::upload_path(&mut session, &image, &config)?;
            session
        }
        Commands::Analyze { payload } => {
            let mut session = Session::new(api, Mode::Camera);
            ui::run_analyze(&mut session, &payload)?;
            session
        }
        Commands::Camera { stdin } => {
            let mut session = Session::new(api, Mode::Camera);
            ui::run_camera(&mut session, &config, stdin)?;
            session
        }
        Commands::InitConfig => {
            config.save().context("Failed to write config file")?;
            println!("Wrote {}", ClientConfig::path().display());
            return Ok(ExitCode::SUCCESS);
        }
    };

    ui::show(session.client(), output)?;
    Ok(ExitCode::from(exit_code(session.client())))
}

/// 0 safe, 2 suspicious, 3 malicious; 1 when no report was produced.
fn exit_code(client: &ScanClient) -> u8 {
    match client.report() {
        Some(report) => report.risk_level().exit_code(),
        None => 1,
    }
}
