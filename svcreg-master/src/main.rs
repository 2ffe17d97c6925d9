use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use svcreg_core::{
    bootstrap::{init_database, load_master_config},
    logging, MemoryRegistryStore, PgRegistryStore, RegistryStore,
};
use svcreg_master::{migrations::run_migrations, MasterContext, MasterListener};

#[derive(Parser, Debug)]
#[command(name = "svcreg-master")]
#[command(about = "Service registry master: answers register and discover requests", long_about = None)]
struct Args {
    /// Config file (YAML, JSON or TOML). Defaults to $SVCREG_CONFIG_PATH or ./config/master.yaml
    #[arg(short, long)]
    config: Option<String>,

    /// Keep the registry in process memory instead of PostgreSQL
    #[arg(long, env = "SVCREG_MEMORY_STORE")]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration (fatal on any problem)
    let config = load_master_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("svcreg master starting...");

    // 3. Open the registry store
    let store: Arc<dyn RegistryStore> = if args.memory {
        warn!("Using in-memory registry store; registrations are lost on exit");
        Arc::new(MemoryRegistryStore::new())
    } else {
        let pool = init_database(&config.database).await?;
        run_migrations(&pool).await?;
        Arc::new(PgRegistryStore::new(pool, config.database.query_timeout()))
    };

    // 4. Build the shared context and start accepting
    let ctx = Arc::new(MasterContext::new(store, &config.server));
    let listener = MasterListener::bind(&config.listen_address(), ctx)
        .await
        .map_err(|e| {
            error!("Failed to bind {}: {}", config.listen_address(), e);
            anyhow::anyhow!("Failed to bind {}: {e}", config.listen_address())
        })?;

    listener.serve_with_shutdown(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
