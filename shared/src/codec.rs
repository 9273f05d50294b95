//! Length-prefixed framing of [`Message`]s over an ordered byte stream.
//!
//! Each frame is a little-endian `u32` payload length followed by the
//! bincode payload. The whole frame is read before decoding, so a payload
//! that fails to decode leaves the stream aligned on the next frame.

use crate::protocol::Message;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed payload: {0}")]
    Encode(#[from] bincode::Error),
    #[error("frame of {0} bytes exceeds the frame size limit")]
    FrameTooLarge(usize),
}

impl CodecError {
    /// A malformed payload only loses that one message; every other error
    /// leaves the stream unusable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CodecError::Encode(_))
    }
}

/// Reads the next message. Returns `Ok(None)` when the peer closed the
/// stream cleanly on a frame boundary.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Message>, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    // EOF is only clean before the first prefix byte.
    if reader.read(&mut len_bytes[..1]).await? == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut len_bytes[1..]).await?;

    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(Some(Message::from_bytes(&payload)?))
}

pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let payload = message.to_bytes()?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(payload.len()));
    }

    writer
        .write_all(&(payload.len() as u32).to_le_bytes())
        .await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Encodes a message into a complete frame.
pub fn encode_frame(message: &Message) -> Result<Vec<u8>, CodecError> {
    let payload = message.to_bytes()?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}
