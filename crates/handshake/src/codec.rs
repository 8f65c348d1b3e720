//! Wire codec: `u32` big-endian length prefix + payload.

use std::io;

use contracts::{ContractError, WireFormat};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame payload
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Serialize one value
pub fn encode<T: Serialize>(format: WireFormat, value: &T) -> Result<Vec<u8>, ContractError> {
    match format {
        WireFormat::Json => {
            serde_json::to_vec(value).map_err(|e| ContractError::codec(format!("json error: {e}")))
        }
        WireFormat::Bincode => bincode::serialize(value)
            .map_err(|e| ContractError::codec(format!("bincode error: {e}"))),
    }
}

/// Deserialize one value
pub fn decode<T: DeserializeOwned>(format: WireFormat, bytes: &[u8]) -> Result<T, ContractError> {
    match format {
        WireFormat::Json => serde_json::from_slice(bytes)
            .map_err(|e| ContractError::codec(format!("json error: {e}"))),
        WireFormat::Bincode => bincode::deserialize(bytes)
            .map_err(|e| ContractError::codec(format!("bincode error: {e}"))),
    }
}

/// Write one length-prefixed frame and flush
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ContractError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(ContractError::codec(format!(
            "frame of {} bytes exceeds limit of {MAX_FRAME_LEN}",
            payload.len()
        )));
    }

    // bounded by MAX_FRAME_LEN above
    let len = payload.len() as u32;
    writer
        .write_u32(len)
        .await
        .map_err(|e| io_error("write frame header", e))?;
    writer
        .write_all(payload)
        .await
        .map_err(|e| io_error("write frame payload", e))?;
    writer.flush().await.map_err(|e| io_error("flush", e))?;
    Ok(())
}

/// Read one length-prefixed frame
///
/// Returns `Ok(None)` when the peer closed the stream on a frame boundary.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, ContractError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(io_error("read frame header", e)),
    };

    if len > MAX_FRAME_LEN {
        return Err(ContractError::codec(format!(
            "announced frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}"
        )));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| io_error("read frame payload", e))?;
    Ok(Some(payload))
}

/// Peer-gone conditions become `ChannelClosed`, everything else `ChannelIo`
pub(crate) fn io_error(context: &str, e: io::Error) -> ContractError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted => {
            ContractError::channel_closed(format!("{context}: {e}"))
        }
        _ => ContractError::ChannelIo {
            message: format!("{context}: {e}"),
        },
    }
}
