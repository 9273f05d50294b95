//! TCP front end of the relay: one handler task per connection.

use crate::registry::Registry;
use log::{debug, error, info, warn};
use shared::codec::{read_message, write_message};
use shared::Message;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};

pub struct RelayServer {
    listener: TcpListener,
    registry: Arc<RwLock<Registry>>,
}

impl RelayServer {
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Relay listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            registry: Arc::new(RwLock::new(Registry::new())),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<RwLock<Registry>> {
        Arc::clone(&self.registry)
    }

    pub async fn run(self) -> io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let registry = Arc::clone(&self.registry);
                        tokio::spawn(handle_connection(stream, addr, registry));
                    }
                    Err(e) => error!("Error accepting connection: {}", e),
                },

                _ = &mut shutdown => {
                    info!("Relay shutting down");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, registry: Arc<RwLock<Registry>>) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
    }
    let (mut reader, mut writer) = stream.into_split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let connection = registry.write().await.register(tx);
    info!("Connection {} from {}", connection, addr);

    let writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = write_message(&mut writer, &message).await {
                error!("Error sending {} to {}: {}", message.name(), addr, e);
                break;
            }
        }
        if let Err(e) = writer.shutdown().await {
            debug!("Error shutting down writer for {}: {}", addr, e);
        }
    });

    loop {
        match read_message(&mut reader).await {
            Ok(Some(Message::Join {
                player_id,
                display_name,
                variant,
            })) => {
                if let Err(e) = registry
                    .write()
                    .await
                    .join(connection, player_id, display_name, variant)
                {
                    warn!("Join from connection {} refused: {}", connection, e);
                }
            }
            Ok(Some(message)) => {
                debug!("Connection {} sent {}", connection, message.name());
                registry.write().await.forward(connection, message);
            }
            Ok(None) => break,
            Err(e) if e.is_recoverable() => {
                warn!("Dropping malformed frame from {}: {}", addr, e);
            }
            Err(e) => {
                error!("Error reading from {}: {}", addr, e);
                break;
            }
        }
    }

    info!("Connection {} from {} closed", connection, addr);
    registry.write().await.disconnect(connection);
    if let Err(e) = writer_task.await {
        error!("Writer task for {} failed: {}", addr, e);
    }
}
