//! Length-delimited framing for messages on a byte stream.
//!
//! Each frame is a `u32` little-endian payload length followed by the
//! payload. One frame carries exactly one encoded message (or one opaque
//! sample), so the codec in [`super::wire`] always sees a complete buffer.

use crate::protocol::wire::WireError;
use crate::types::fields::FieldList;
use crate::types::identity::Identity;
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Default cap on a single frame's payload
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// A byte stream wrapped in the frame codec
pub type MessageStream<T> = Framed<T, LengthDelimitedCodec>;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("connection closed while waiting for {0}")]
    Closed(&'static str),

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed {what}: {source}")]
    Wire {
        what: &'static str,
        #[source]
        source: WireError,
    },
}

/// Frame codec with a little-endian `u32` length prefix
pub fn codec(max_frame_len: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .little_endian()
        .length_field_length(4)
        .max_frame_length(max_frame_len)
        .new_codec()
}

pub fn framed<T>(io: T, max_frame_len: usize) -> MessageStream<T>
where
    T: AsyncRead + AsyncWrite,
{
    Framed::new(io, codec(max_frame_len))
}

pub async fn send_frame<T>(
    stream: &mut MessageStream<T>,
    payload: impl Into<Bytes>,
) -> Result<(), FrameError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    stream.send(payload.into()).await?;
    Ok(())
}

/// Wait for the next frame. `what` names the expected message in errors.
pub async fn recv_frame<T>(
    stream: &mut MessageStream<T>,
    what: &'static str,
) -> Result<BytesMut, FrameError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    match stream.next().await {
        Some(Ok(frame)) => Ok(frame),
        Some(Err(e)) => Err(FrameError::Io(e)),
        None => Err(FrameError::Closed(what)),
    }
}

pub async fn send_identity<T>(
    stream: &mut MessageStream<T>,
    identity: &Identity,
) -> Result<(), FrameError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let payload = identity.to_bytes().map_err(|source| FrameError::Wire {
        what: "identity",
        source,
    })?;
    send_frame(stream, payload).await
}

pub async fn recv_identity<T>(stream: &mut MessageStream<T>) -> Result<Identity, FrameError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let frame = recv_frame(stream, "identity").await?;
    Identity::from_bytes(&frame).map_err(|source| FrameError::Wire {
        what: "identity",
        source,
    })
}

pub async fn send_field_list<T>(
    stream: &mut MessageStream<T>,
    fields: &FieldList,
) -> Result<(), FrameError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let payload = fields.to_bytes().map_err(|source| FrameError::Wire {
        what: "field list",
        source,
    })?;
    send_frame(stream, payload).await
}

pub async fn recv_field_list<T>(stream: &mut MessageStream<T>) -> Result<FieldList, FrameError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let frame = recv_frame(stream, "field list").await?;
    FieldList::from_bytes(&frame).map_err(|source| FrameError::Wire {
        what: "field list",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::identity::Gender;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_handshake_over_duplex() {
        let (a, b) = tokio::io::duplex(1024);
        let mut client = framed(a, DEFAULT_MAX_FRAME_LEN);
        let mut server = framed(b, DEFAULT_MAX_FRAME_LEN);

        let identity = Identity::new(
            42,
            "ada",
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
            Gender::FEMALE,
        );
        send_identity(&mut client, &identity).await.unwrap();
        assert_eq!(recv_identity(&mut server).await.unwrap(), identity);

        let fields = FieldList::new(["translation", "feelings"]);
        send_field_list(&mut server, &fields).await.unwrap();
        assert_eq!(recv_field_list(&mut client).await.unwrap(), fields);
    }

    #[tokio::test]
    async fn test_frame_prefix_is_little_endian() {
        use tokio::io::AsyncReadExt;

        let (a, mut b) = tokio::io::duplex(64);
        let mut sender = framed(a, DEFAULT_MAX_FRAME_LEN);
        send_frame(&mut sender, Bytes::from_static(b"abc")).await.unwrap();

        let mut raw = [0u8; 7];
        b.read_exact(&mut raw).await.unwrap();
        assert_eq!(&raw[..4], &3u32.to_le_bytes());
        assert_eq!(&raw[4..], b"abc");
    }

    #[tokio::test]
    async fn test_closed_before_frame() {
        let (a, b) = tokio::io::duplex(64);
        drop(a);
        let mut server = framed(b, DEFAULT_MAX_FRAME_LEN);
        let err = recv_identity(&mut server).await.unwrap_err();
        assert!(matches!(err, FrameError::Closed("identity")));
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let (a, b) = tokio::io::duplex(64);
        let mut client = framed(a, DEFAULT_MAX_FRAME_LEN);
        let mut server = framed(b, DEFAULT_MAX_FRAME_LEN);
        send_frame(&mut client, Bytes::from_static(&[1, 2, 3])).await.unwrap();
        let err = recv_identity(&mut server).await.unwrap_err();
        assert!(matches!(
            err,
            FrameError::Wire {
                what: "identity",
                source: WireError::TruncatedInput { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (a, b) = tokio::io::duplex(1024);
        let mut client = framed(a, DEFAULT_MAX_FRAME_LEN);
        let mut server = framed(b, 8);
        send_frame(&mut client, vec![0u8; 64]).await.unwrap();
        let err = recv_frame(&mut server, "sample").await.unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
    }
}
