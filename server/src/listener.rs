//! Accepts TCP connections and turns each one into a seated player

use crate::coordinator::TurnCoordinator;
use crate::session::{spawn_writer, PlayerSession};
use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

pub struct SessionListener {
    listener: TcpListener,
    coordinator: Arc<TurnCoordinator>,
}

impl SessionListener {
    pub async fn bind(addr: &str, coordinator: Arc<TurnCoordinator>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            coordinator,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn coordinator(&self) -> Arc<TurnCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Accepts connections forever. A failed accept is logged and the
    /// loop carries on.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => self.admit(stream, addr).await,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    /// Seats the player before returning, so ids follow accept order
    async fn admit(&self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Could not disable Nagle for {}: {}", addr, e);
        }

        let (reader, writer) = stream.into_split();
        let outbox = spawn_writer(writer);
        let id = self.coordinator.register(outbox.clone()).await;

        info!(
            "Player {} connected from {} ({} client(s) connected)",
            id,
            addr,
            self.coordinator.player_count().await
        );

        let session = PlayerSession::new(id, reader, outbox, self.coordinator());
        tokio::spawn(session.run());
    }
}
