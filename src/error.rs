//! Error types for the game engine.
//!
//! Every engine verb returns [`GameError`] on failure. The enum mirrors the
//! error taxonomy exposed to API callers: each variant maps to a stable
//! machine-readable code via [`GameError::code`], so an HTTP layer can build
//! its `{error, code, detail}` envelope without inspecting variant payloads.
//!
//! Collaborator failures (LLM timeouts, forecast errors) never appear here;
//! they are swallowed inside the engine by deterministic fallbacks. Only
//! storage and serialization problems surface as `internal`.

use std::error::Error as StdError;
use std::fmt;

/// Error type for all engine operations.
#[derive(Debug)]
pub enum GameError {
    /// Bad input from the caller (amounts, units, unknown keys).
    Validation(String),

    /// Session, card, or choice missing or inactive.
    NotFound(String),

    /// Actor does not own the session.
    PermissionDenied,

    /// A level or credit gate is not met.
    Gated(String),

    /// Not enough cash for the requested operation.
    InsufficientFunds { required: i64, available: i64 },

    /// Not enough units of a holding for the requested operation.
    InsufficientUnits { requested: f64, available: f64 },

    /// A second application for the same IPO.
    DuplicateApplication(String),

    /// Underlying SQLite failure.
    Storage(rusqlite::Error),

    /// JSON column (de)serialization failure.
    Serialization(serde_json::Error),

    /// Unexpected internal state; logged server-side.
    Internal(String),
}

impl GameError {
    /// Stable machine code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Validation(_) => "validation",
            GameError::NotFound(_) => "not_found",
            GameError::PermissionDenied => "permission_denied",
            GameError::Gated(_) => "gated",
            GameError::InsufficientFunds { .. } => "insufficient_funds",
            GameError::InsufficientUnits { .. } => "insufficient_units",
            GameError::DuplicateApplication(_) => "duplicate_application",
            GameError::Storage(_) | GameError::Serialization(_) | GameError::Internal(_) => {
                "internal"
            }
        }
    }
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::Validation(msg) => write!(f, "{}", msg),
            GameError::NotFound(msg) => write!(f, "{}", msg),
            GameError::PermissionDenied => {
                write!(f, "You do not own this game session.")
            }
            GameError::Gated(msg) => write!(f, "{}", msg),
            GameError::InsufficientFunds { required, available } => {
                write!(
                    f,
                    "Insufficient funds: need \u{20B9}{}, have \u{20B9}{}.",
                    required, available
                )
            }
            GameError::InsufficientUnits { requested, available } => {
                write!(
                    f,
                    "Insufficient units: requested {:.2}, own {:.2}.",
                    requested, available
                )
            }
            GameError::DuplicateApplication(name) => {
                write!(f, "Already applied for the {} IPO.", name)
            }
            GameError::Storage(e) => write!(f, "Storage error: {}", e),
            GameError::Serialization(e) => write!(f, "Serialization error: {}", e),
            GameError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for GameError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            GameError::Storage(e) => Some(e),
            GameError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for GameError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => {
                GameError::NotFound("Record not found.".to_string())
            }
            other => GameError::Storage(other),
        }
    }
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        GameError::Serialization(err)
    }
}

/// Type alias for Result with GameError.
pub type Result<T> = std::result::Result<T, GameError>;
