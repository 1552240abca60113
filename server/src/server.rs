//! TCP accept loop and per-connection session

use crate::config::ServerConfig;
use crate::store::SampleStore;
use anyhow::{Context, Result};
use parley_shared::protocol::frame;
use parley_shared::FieldList;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// One client connection: identity in, field list out, sample in.
#[derive(Clone)]
struct Session {
    store: Arc<SampleStore>,
    fields: Arc<FieldList>,
    max_frame_len: usize,
}

impl Session {
    async fn run(self, socket: TcpStream) -> Result<PathBuf> {
        let mut stream = frame::framed(socket, self.max_frame_len);

        let identity = frame::recv_identity(&mut stream)
            .await
            .context("Handshake failed")?;
        info!("Hello from {}", identity);

        frame::send_field_list(&mut stream, &self.fields)
            .await
            .context("Failed to send supported fields")?;

        let sample = frame::recv_frame(&mut stream, "sample")
            .await
            .context("Failed to receive sample")?;
        debug!(
            "Received {} sample bytes from user {}",
            sample.len(),
            identity.user_id()
        );

        self.store.save(&identity, &sample).await
    }
}

/// Bound server, ready to accept connections
pub struct Server {
    listener: TcpListener,
    session: Session,
    session_timeout: Duration,
}

impl Server {
    /// Validate `config` and bind its listen address.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

        let session = Session {
            store: Arc::new(SampleStore::new(config.data_dir.clone())),
            fields: Arc::new(config.fields()),
            max_frame_len: config.max_frame_len,
        };

        Ok(Self {
            listener,
            session,
            session_timeout: config.session_timeout(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn store(&self) -> Arc<SampleStore> {
        self.session.store.clone()
    }

    /// Accept connections forever.
    pub async fn serve(self) -> Result<()> {
        self.serve_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves. Sessions already running
    /// are left to finish on their own tasks.
    pub async fn serve_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Serving {} on {} (data in {})",
            self.session.fields,
            self.local_addr()?,
            self.session.store.root().display()
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("Accept failed: {}", e);
                            continue;
                        }
                    };
                    debug!("Connection from {}", peer);
                    self.spawn_session(socket, peer);
                }
            }
        }
    }

    fn spawn_session(&self, socket: TcpStream, peer: SocketAddr) {
        let session = self.session.clone();
        let timeout = self.session_timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, session.run(socket)).await {
                Ok(Ok(path)) => info!("Stored sample from {} at {}", peer, path.display()),
                Ok(Err(e)) => warn!("Session with {} failed: {:#}", peer, e),
                Err(_) => warn!("Session with {} timed out after {:?}", peer, timeout),
            }
        });
    }
}

/// Run a server on `address` storing samples under `data_dir` until Ctrl-C.
///
/// Other settings come from [`ServerConfig::load`] without a config file.
pub async fn run_server(address: &str, data_dir: impl Into<PathBuf>) -> Result<()> {
    let mut config = ServerConfig::load(None)?;
    config.listen_addr = address.to_string();
    config.data_dir = data_dir.into();

    let server = Server::bind(config).await?;
    server.serve_until(shutdown_signal()).await
}

/// Resolves on Ctrl-C. Never resolves if the signal handler cannot be installed.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
