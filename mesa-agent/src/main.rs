use std::sync::Arc;

use mesa_agent::{AgentConfig, AgentServer, SystemDelivery, logger};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = AgentConfig::from_env();
    logger::init_logger(&config.log_level, config.log_dir.as_deref());

    tracing::info!(
        listen = %config.listen_addr,
        device_timeout_ms = config.device_timeout_ms,
        "Mesa print agent starting"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    let delivery = Arc::new(SystemDelivery::new(config.device_timeout()));
    AgentServer::new(delivery, shutdown)
        .run(&config.listen_addr)
        .await?;

    Ok(())
}
