use anyhow::Result;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use parley_server::{Server, ServerConfig};
use parley_shared::protocol::frame::{self, FrameError, DEFAULT_MAX_FRAME_LEN};
use parley_shared::{FieldList, Gender, Identity};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::oneshot;

fn ada() -> Identity {
    Identity::new(
        42,
        "ada",
        Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
        Gender::FEMALE,
    )
}

async fn start(config: ServerConfig) -> Result<(SocketAddr, oneshot::Sender<()>)> {
    let server = Server::bind(config).await?;
    let addr = server.local_addr()?;
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server.serve_until(async {
        let _ = rx.await;
    }));
    Ok((addr, tx))
}

fn test_config(data_dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        data_dir: data_dir.to_path_buf(),
        supported_fields: vec!["translation".to_string(), "feelings".to_string()],
        ..Default::default()
    }
}

/// Connect and run a full session, returning the announced fields.
async fn upload(addr: SocketAddr, identity: &Identity, sample: &'static [u8]) -> Result<FieldList> {
    let socket = TcpStream::connect(addr).await?;
    let mut stream = frame::framed(socket, DEFAULT_MAX_FRAME_LEN);

    frame::send_identity(&mut stream, identity).await?;
    let fields = frame::recv_field_list(&mut stream).await?;
    frame::send_frame(&mut stream, Bytes::from_static(sample)).await?;

    // The server closes the connection once the sample is stored.
    let end = frame::recv_frame(&mut stream, "close").await;
    assert!(matches!(end, Err(FrameError::Closed(_))));
    Ok(fields)
}

#[tokio::test]
async fn test_session_stores_sample() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (addr, _shutdown) = start(test_config(dir.path())).await?;

    let fields = upload(addr, &ada(), b"sample-bytes").await?;
    assert_eq!(fields, FieldList::new(["translation", "feelings"]));

    let sample = dir.path().join("42").join("0.sample");
    assert_eq!(tokio::fs::read(&sample).await?, b"sample-bytes");

    let json = tokio::fs::read_to_string(dir.path().join("42").join("user.json")).await?;
    let stored: Identity = serde_json::from_str(&json)?;
    assert_eq!(stored, ada());

    Ok(())
}

#[tokio::test]
async fn test_malformed_handshake_does_not_stop_server() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (addr, _shutdown) = start(test_config(dir.path())).await?;

    let socket = TcpStream::connect(addr).await?;
    let mut stream = frame::framed(socket, DEFAULT_MAX_FRAME_LEN);
    frame::send_frame(&mut stream, Bytes::from_static(&[0xde, 0xad])).await?;
    let err = frame::recv_field_list(&mut stream).await.unwrap_err();
    assert!(matches!(err, FrameError::Closed(_) | FrameError::Io(_)));

    upload(addr, &ada(), b"after-garbage").await?;
    assert!(dir.path().join("42").join("0.sample").exists());
    Ok(())
}

#[tokio::test]
async fn test_idle_session_times_out() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = ServerConfig {
        session_timeout_secs: 1,
        ..test_config(dir.path())
    };
    let (addr, _shutdown) = start(config).await?;

    let socket = TcpStream::connect(addr).await?;
    let mut stream = frame::framed(socket, DEFAULT_MAX_FRAME_LEN);
    let res = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        frame::recv_frame(&mut stream, "field list"),
    )
    .await?;
    assert!(res.is_err());
    Ok(())
}

#[tokio::test]
async fn test_bind_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        supported_fields: vec![],
        ..test_config(dir.path())
    };
    assert!(Server::bind(config).await.is_err());
}

#[tokio::test]
async fn test_serve_forever_accepts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let server = Server::bind(test_config(dir.path())).await?;
    let addr = server.local_addr()?;
    let store = server.store();
    let handle = tokio::spawn(server.serve());

    upload(addr, &ada(), b"one").await?;
    upload(addr, &ada(), b"two").await?;
    assert_eq!(store.samples(42).await?.len(), 2);

    handle.abort();
    Ok(())
}
