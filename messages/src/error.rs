use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame too large: {size} > {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("truncated frame: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("malformed message: {0}")]
    Malformed(String),
}
