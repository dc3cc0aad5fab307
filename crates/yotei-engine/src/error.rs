//! Error types for yotei-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum YoteiError {
    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),
}

pub type Result<T> = std::result::Result<T, YoteiError>;
