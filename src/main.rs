use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shipyard::manager::{self, SystemProfile};
use shipyard::server::ShipyardServer;
use shipyard::{ShipService, ShipyardDb};

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Ship catalog server", long_about = None)]
struct Args {
    #[clap(long, default_value = "127.0.0.1:9000")]
    addr: String,

    /// Segment file holding the ship log
    #[clap(long, default_value = "shipyard.dat")]
    data: PathBuf,

    /// Seconds between background compactions (0 disables)
    #[clap(long, default_value = "600")]
    compact_every: u64,

    /// Skip fsync on every write
    #[clap(long)]
    no_fsync: bool,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
    .with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,shipyard=info")),
    )
    .with_target(false)
    .with_level(true)
    .init();

    let mut profile = SystemProfile::detect();
    if args.no_fsync {
        profile.strict_durability = false;
    }

    info!(
        cores = profile.logical_cores,
        workers = profile.worker_threads,
        durability = if profile.strict_durability { "strict (fsync)" } else { "relaxed" },
        "Resource profile"
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
    .worker_threads(profile.worker_threads)
    .enable_all()
    .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Failed to start runtime");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(async_main(args, profile)) {
        error!(error = %e, "Shipyard stopped");
        std::process::exit(1);
    }
}

async fn async_main(args: Args, profile: SystemProfile) -> Result<(), Box<dyn std::error::Error>> {
    info!(path = %args.data.display(), "Initializing storage engine");
    let db = Arc::new(ShipyardDb::open(&args.data, profile.strict_durability)?);

    manager::start_compaction_thread(db.clone(), Duration::from_secs(args.compact_every));

    let server = ShipyardServer::new(ShipService::new(db));
    let addr = args.addr.clone();

    tokio::select! {
        res = server.run(&addr) => res?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
