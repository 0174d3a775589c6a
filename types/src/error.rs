//! Error type for parsing fundamental values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid node address: {0}")]
    InvalidAddress(String),
}
