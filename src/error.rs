//! Error types for calltrack-rs.

use thiserror::Error;

use crate::model::CallbackId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("callback {id} is already claimed by {holder}")]
    ClaimHeld { id: CallbackId, holder: String },

    #[error("callback {id} can only be released by its current claimant")]
    NotClaimant { id: CallbackId },

    #[error("invalid activity type: {0}")]
    InvalidActivityType(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
