use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ReputationError {
    #[error("invalid reputation config: {0}")]
    InvalidConfig(String),
}
