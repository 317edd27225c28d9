use anyhow::Result;
use clap::Parser;
use pickup::{JobConfig, PickupResult, RunContext, Settings, SystemAction};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "pickup")]
struct Cli {
    /// Job configuration file (YAML)
    config: PathBuf,

    /// Log debug detail to pickup.log in the state directory
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding checkpoints, manifests and logs
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.state_dir, cli.verbose);
    settings.ensure_directories().await?;
    let log_guard = pickup::logging::init_logging(&settings)?;

    info!("Starting pickup with {:?}", cli.config);

    if let Err(e) = run(&cli.config, settings).await {
        error!("{}", e);
        let code = e.exit_code();
        if code != 0 {
            // Flush the log file before exiting
            drop(log_guard);
            std::process::exit(code);
        }
    }

    Ok(())
}

async fn run(config_path: &Path, settings: Settings) -> PickupResult<()> {
    let config = JobConfig::load(config_path).await?;
    let action = SystemAction::new(settings.archiver.clone());
    let mut context = RunContext::new(settings, config, action).await;
    context.run().await?;
    Ok(())
}
