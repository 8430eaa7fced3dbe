use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, error, info, info_span, warn};

use crate::broadcast::{Broadcaster, Outbox};
use crate::config::ServerConfig;
use crate::connection::handle_client;
use crate::error::{ChatError, bind_error};
use crate::registry::SessionRegistry;

/// What every connection task shares: the registry and a producer handle
/// on the outbound queue. Nothing else crosses connections.
#[derive(Debug, Clone)]
pub struct ChatState {
    pub registry: Arc<SessionRegistry>,
    pub outbox: Outbox,
}

/// A bound listener plus the state it will hand to each connection.
pub struct Server {
    listener: TcpListener,
    state: ChatState,
    broadcaster: Broadcaster,
}

impl Server {
    /// Bind the listening socket. Failing here is fatal to startup.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ChatError> {
        let listener = TcpListener::bind((config.addr.as_str(), config.port))
            .await
            .map_err(|e| bind_error(config.bind_addr(), e))?;

        let registry = Arc::new(SessionRegistry::new());
        let (broadcaster, outbox) = Broadcaster::new(Arc::clone(&registry));

        Ok(Self {
            listener,
            state: ChatState { registry, outbox },
            broadcaster,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ChatError> {
        Ok(self.listener.local_addr()?)
    }

    /// Start the broadcaster and accept connections for the life of the
    /// process. Accept errors are logged and the loop carries on.
    pub async fn run(self) {
        let Server {
            listener,
            state,
            broadcaster,
        } = self;

        tokio::spawn(broadcaster.run());

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => spawn_client(state.clone(), stream, peer),
                Err(e) => error!(error = %e, "accept failed"),
            }
        }
    }
}

fn spawn_client(state: ChatState, stream: TcpStream, peer: SocketAddr) {
    let span = info_span!("client", %peer);
    tokio::spawn(
        async move {
            info!("connected");
            let (reader, writer) = stream.into_split();
            if let Err(e) = handle_client(state, Box::new(BufReader::new(reader)), Box::new(writer)).await {
                warn!(error = %e, "connection ended with error");
            }
            info!("disconnected");
        }
        .instrument(span),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_an_ephemeral_port() {
        let config = ServerConfig::builder().port(0).build();
        let server = Server::bind(&config).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(server.state.registry.is_empty().await);
    }

    #[tokio::test]
    async fn bind_conflict_is_reported_with_the_address() {
        let config = ServerConfig::builder().port(0).build();
        let first = Server::bind(&config).await.unwrap();
        let taken = first.local_addr().unwrap().port();

        let clash = ServerConfig::builder().port(taken).build();
        match Server::bind(&clash).await {
            Err(ChatError::Bind { addr, .. }) => assert_eq!(addr, clash.bind_addr()),
            Err(other) => panic!("expected a bind error, got {other}"),
            Ok(_) => panic!("second bind on port {taken} should fail"),
        }
    }
}
