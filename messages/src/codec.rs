//! Frame codec: length-prefixed bincode.
//!
//! A frame is a 4-byte big-endian body length followed by the bincode
//! encoding of the value.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{CodecError, Message};

/// Maximum frame body size in bytes.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024; // 1 MiB

const LEN_PREFIX: usize = 4;

/// Encode a value as a single length-prefixed frame.
pub fn encode(value: &impl Serialize) -> Result<Vec<u8>, CodecError> {
    let body = bincode::serialize(value).map_err(|e| CodecError::Malformed(e.to_string()))?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: body.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    let mut frame = Vec::with_capacity(LEN_PREFIX + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode an unframed bincode body.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(data).map_err(|e| CodecError::Malformed(e.to_string()))
}

/// Decode the first frame in `data`, returning the value and the number of
/// bytes consumed.
pub fn decode_framed<T: DeserializeOwned>(data: &[u8]) -> Result<(T, usize), CodecError> {
    if data.len() < LEN_PREFIX {
        return Err(CodecError::Truncated {
            needed: LEN_PREFIX,
            available: data.len(),
        });
    }
    let mut len_bytes = [0u8; LEN_PREFIX];
    len_bytes.copy_from_slice(&data[..LEN_PREFIX]);
    let body_len = u32::from_be_bytes(len_bytes) as usize;
    if body_len > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: body_len,
            max: MAX_FRAME_SIZE,
        });
    }
    let end = LEN_PREFIX + body_len;
    if data.len() < end {
        return Err(CodecError::Truncated {
            needed: end,
            available: data.len(),
        });
    }
    let value = decode(&data[LEN_PREFIX..end])?;
    Ok((value, end))
}

/// Encode a [`Message`] as a frame.
pub fn encode_message(message: &Message) -> Result<Vec<u8>, CodecError> {
    encode(message)
}

/// Decode exactly one [`Message`] frame; trailing bytes are rejected.
pub fn decode_message(frame: &[u8]) -> Result<Message, CodecError> {
    let (message, consumed) = decode_framed::<Message>(frame)?;
    if consumed != frame.len() {
        return Err(CodecError::Malformed(format!(
            "{} trailing bytes after frame",
            frame.len() - consumed
        )));
    }
    Ok(message)
}
