use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use slp_payout::api::SkyMavisClient;
use slp_payout::blockchain::RoninRpcClient;
use slp_payout::config::Settings;
use slp_payout::logging;
use slp_payout::payout::{Collaborators, PayoutRun, RunOutcome};
use slp_payout::presenter::ConsolePresenter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the payout JSON config file
    config: PathBuf,
}

async fn run(args: Args) -> Result<RunOutcome> {
    let settings = Settings::load(&args.config)?;

    let gateway = RoninRpcClient::new(&settings.network, settings.slp_contract)
        .context("setting up the Ronin RPC client")?;
    let sky_mavis = Arc::new(
        SkyMavisClient::new(&settings.network).context("setting up the game API client")?,
    );
    let collaborators = Collaborators {
        gateway: Arc::new(gateway),
        rewards: sky_mavis.clone(),
        identity: sky_mavis,
        presenter: Arc::new(ConsolePresenter::new(settings.network.explorer_url.clone())),
    };

    PayoutRun::new(settings, collaborators).execute().await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match logging::init(logging::DEFAULT_LOG_DIR) {
        Ok(path) => tracing::info!("Run log: {}", path.display()),
        Err(e) => eprintln!("warning: run log disabled: {:#}", e),
    }

    match run(args).await {
        Ok(RunOutcome::Executed { summary, .. }) if !summary.is_clean() => {
            tracing::warn!("Payout finished with problems: {:?}", summary);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
