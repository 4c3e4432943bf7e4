use mesa_server::utils::init_logger;
use mesa_server::{Config, Server, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment and logging
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger(&config.log_level, config.log_dir.as_deref());

    tracing::info!(
        http_port = config.http_port,
        agent_addr = %config.agent_addr,
        "Mesa print server starting"
    );

    // 2. Databases, agent transport, print event worker
    let state = ServerState::initialize(&config)?;

    // 3. HTTP API until Ctrl-C
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
