//! Parley upload client
//!
//! Connects to a server, introduces the user with an identity handshake,
//! learns which sample fields the server supports, and uploads one sample
//! file as an opaque frame.

pub mod config;
pub mod retry;

pub use config::ClientConfig;

use anyhow::{Context, Result};
use parley_shared::protocol::frame::{self, FrameError};
use parley_shared::FieldList;
use std::path::Path;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Upload the sample at `sample_path` to the server at `address` ("host:port").
///
/// Returns the fields the server announced. Completes once the server has
/// closed the connection, which it does after storing the sample.
pub async fn upload_sample(
    address: &str,
    sample_path: impl AsRef<Path>,
    config: &ClientConfig,
) -> Result<FieldList> {
    config.validate().context("Invalid configuration")?;

    let sample_path = sample_path.as_ref();
    let sample = tokio::fs::read(sample_path)
        .await
        .with_context(|| format!("Failed to read sample {}", sample_path.display()))?;
    if sample.len() > config.max_frame_len {
        anyhow::bail!(
            "Sample {} is {} bytes, above the {} byte frame limit",
            sample_path.display(),
            sample.len(),
            config.max_frame_len
        );
    }
    let sample_len = sample.len();

    let socket = retry::retry_with_backoff(
        "connect",
        config.connect_attempts,
        config.initial_backoff,
        || TcpStream::connect(address),
    )
    .await
    .with_context(|| format!("Failed to connect to {}", address))?;
    debug!("Connected to {}", address);

    let mut stream = frame::framed(socket, config.max_frame_len);

    frame::send_identity(&mut stream, &config.identity)
        .await
        .context("Failed to send identity")?;
    let fields = frame::recv_field_list(&mut stream)
        .await
        .context("Failed to receive supported fields")?;
    info!("{}", fields);

    frame::send_frame(&mut stream, sample)
        .await
        .context("Failed to upload sample")?;

    match frame::recv_frame(&mut stream, "close").await {
        Err(FrameError::Closed(_)) => {}
        Ok(extra) => warn!("Ignoring {} unexpected bytes after upload", extra.len()),
        Err(e) => return Err(e).context("Server did not confirm the upload"),
    }

    info!(
        "Uploaded {} ({} bytes) for {}",
        sample_path.display(),
        sample_len,
        config.identity
    );
    Ok(fields)
}
