//! Puzzle Badges Server
//!
//! Serves game submission, player lookup and credential issuance over
//! WebSocket.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use puzzle_badges::{
    network::BadgeServer, storage::SnapshotStore, AchievementService, AttestationSigner,
    ServerConfig, VERSION,
};

#[cfg(feature = "debug-tracing")]
const DEFAULT_FILTER: &str = "debug";
#[cfg(not(feature = "debug-tracing"))]
const DEFAULT_FILTER: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Puzzle Badges Server v{}", VERSION);

    let config = ServerConfig::from_env().context("loading configuration")?;
    info!("{:?}", config);

    let signer = AttestationSigner::from_private_key_hex(&config.signer_key)
        .context("parsing PRIVATE_KEY")?;
    info!("Attestation signer: {}", signer.address());

    let service = match &config.data_path {
        Some(path) => AchievementService::open(
            signer,
            SnapshotStore::new(path),
            config.leaderboard_limit,
        )
        .await
        .context("loading snapshot")?,
        None => {
            warn!("DATA_PATH not set, state is kept in memory only");
            AchievementService::new(signer, config.leaderboard_limit)
        }
    };

    let server = Arc::new(BadgeServer::new(config, Arc::new(service)));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            signal_server.shutdown();
        }
    });

    server.run().await.context("server failed")?;
    info!("Server stopped");

    Ok(())
}
