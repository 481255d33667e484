use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::envelope::Envelope;

/// Maximum single-message size accepted by [`read_envelope`], guarding
/// against a misbehaving sandbox sending an unbounded length prefix.
const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

/// Errors raised while reading or writing a framed envelope.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The underlying stream closed or failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The envelope failed to serialize or deserialize as JSON.
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// The declared frame length exceeded [`MAX_FRAME_BYTES`].
    #[error("frame length {0} exceeds maximum of {MAX_FRAME_BYTES}")]
    FrameTooLarge(u32),
}

/// Write one envelope as a 4-byte big-endian length prefix followed by its
/// JSON encoding, per the separate-OS-process sandbox redesign of §9.
///
/// # Errors
///
/// Returns [`FramingError::Io`] on write failure or [`FramingError::Json`]
/// if the envelope cannot be serialized.
pub async fn write_envelope<W: AsyncWrite + Unpin>(
    writer: &mut W,
    envelope: &Envelope,
) -> Result<(), FramingError> {
    let body = serde_json::to_vec(envelope)?;
    let len = u32::try_from(body.len()).unwrap_or(u32::MAX);
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed envelope from `reader`.
///
/// # Errors
///
/// Returns [`FramingError::Io`] if the stream closes mid-frame,
/// [`FramingError::FrameTooLarge`] if the declared length exceeds
/// [`MAX_FRAME_BYTES`], or [`FramingError::Json`] if the body is not a
/// valid envelope.
pub async fn read_envelope<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Envelope, FramingError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(FramingError::FrameTooLarge(len));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    let envelope = serde_json::from_slice(&body)?;
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrips_through_an_in_memory_duplex() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        let sent = Envelope::sys_call("db.query", serde_json::json!({"sql": "SELECT 1"}));
        let sent_id = sent.id;
        write_envelope(&mut client, &sent).await.unwrap();

        let received = read_envelope(&mut server).await.unwrap();
        assert_eq!(received.id, sent_id);
        assert_eq!(received.method.as_deref(), Some("db.query"));
    }

    #[tokio::test]
    async fn rejects_oversized_frame() {
        let (mut client, mut server) = tokio::io::duplex(16);
        let huge_len: u32 = MAX_FRAME_BYTES + 1;
        client.write_all(&huge_len.to_be_bytes()).await.unwrap();

        let err = read_envelope(&mut server).await.unwrap_err();
        assert!(matches!(err, FramingError::FrameTooLarge(_)));
    }

    #[tokio::test]
    async fn multiple_envelopes_are_read_in_order() {
        let (mut client, mut server) = tokio::io::duplex(8192);

        let first = Envelope::hook_call("onPromptReceived", serde_json::json!({"prompt": "a"}));
        let second = Envelope::hook_call("onPromptReceived", serde_json::json!({"prompt": "b"}));
        write_envelope(&mut client, &first).await.unwrap();
        write_envelope(&mut client, &second).await.unwrap();

        let got_first = read_envelope(&mut server).await.unwrap();
        let got_second = read_envelope(&mut server).await.unwrap();
        assert_eq!(got_first.id, first.id);
        assert_eq!(got_second.id, second.id);
    }
}
