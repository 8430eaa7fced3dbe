use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tcp_chat_server::{Args, ChatError, Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), ChatError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from(Args::parse());
    let server = Server::bind(&config).await?;
    info!(addr = %server.local_addr()?, "chat server listening");

    server.run().await;
    Ok(())
}
