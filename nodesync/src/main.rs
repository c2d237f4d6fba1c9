mod shutdown;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use nodesync_cluster::{ClusterSnapshotProvider, KubeNodeSource, Reconciler, Schedule, Scheduler};
use nodesync_core::{bootstrap::load_config, logging};
use nodesync_helpers::HelperRegistry;

#[derive(Parser, Debug)]
#[command(name = "nodesync")]
#[command(about = "Keeps HAProxy backends and S3 bucket policies in sync with cluster nodes", long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(long, env = "NODESYNC_CONFIG_PATH")]
    config: Option<String>,

    /// Run a single reconciliation tick and exit
    #[arg(long, conflicts_with = "check_config")]
    once: bool,

    /// Load the config, build the helpers and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load and validate configuration
    let config = load_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("nodesync starting...");

    // 3. Parse the schedule and build helpers
    let schedule = Schedule::parse(&config.schedule)?;
    let helpers = HelperRegistry::with_builtin()
        .build(&config.helpers, &config)
        .await?;

    if args.check_config {
        info!(schedule = %schedule, helpers = ?config.helpers, "Configuration is valid");
        return Ok(());
    }

    // 4. Connect to the cluster
    let source = KubeNodeSource::connect(&config.kubernetes).await?;
    let provider = ClusterSnapshotProvider::new(source);
    let mut reconciler = Reconciler::new(Arc::new(provider), helpers);

    if args.once {
        let outcome = reconciler.tick().await;
        if !outcome.is_success() {
            error!(outcome = ?outcome, "Reconciliation failed");
            return Err(anyhow::anyhow!("reconciliation tick failed: {outcome:?}"));
        }
        info!(outcome = ?outcome, "Reconciliation finished");
        return Ok(());
    }

    // 5. Run until a shutdown signal arrives
    let cancel_token = CancellationToken::new();
    shutdown::cancel_on_signal(cancel_token.clone());

    Scheduler::new(schedule, cancel_token)
        .run_on_start(config.run_on_start)
        .run(&mut reconciler)
        .await;

    info!("nodesync stopped");
    Ok(())
}
