use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::error;

mod loader;
mod record;
mod schema;
mod statement;
mod store;

use loader::BulkLoader;
use store::{HttpGraphStore, StoreError};

/// Bangumi subject loader
///
/// Bulk-loads per-subject JSON snapshot files into the graph store: one
/// vertex per subject, one directed edge per relation. One-shot, sequential,
/// idempotent on rerun.
#[derive(Parser)]
#[command(name = "bgm-loader")]
#[command(about = "Load subject snapshots into the graph store")]
struct Args {
    /// Graph store daemon IP address
    #[arg(long, default_value = "127.0.0.1")]
    addr: String,

    /// Graph store daemon port
    #[arg(long, default_value_t = 3699)]
    port: u16,

    /// Username used to authenticate
    #[arg(short, long, default_value = "nebula")]
    user: String,

    /// Password used to authenticate
    #[arg(short, long, default_value = "root")]
    password: String,

    /// The data folder path
    #[arg(long, default_value = "./Bangumi-Subject/data/")]
    data: PathBuf,

    /// Seconds to wait for the schema change to become queryable
    #[arg(long, default_value_t = 15)]
    settle_secs: u64,

    /// Skip the readiness probe and always sleep the full settle interval
    #[arg(long)]
    no_probe: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut store =
        match HttpGraphStore::connect(&args.addr, args.port, &args.user, &args.password).await {
            Ok(store) => store,
            Err(StoreError::Auth(message)) => {
                // Bad credentials end the run before any phase; the process
                // still exits 0.
                error!("authentication failed: {}", message);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
    // On a first run the namespace does not exist yet; the schema block's own
    // USE clause establishes the session space in that case.
    store.select_namespace(schema::SPACE_NAME).await?;

    let mut loader = BulkLoader::new(
        store,
        args.data,
        Duration::from_secs(args.settle_secs),
        !args.no_probe,
    );
    loader.run().await?;

    Ok(())
}
