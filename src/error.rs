//! Error types for the game core.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type.
///
/// Nothing in the per-frame simulation returns these; they surface at
/// construction time (tuning, palettes) and at the network boundary, where the
/// reconciliation layer logs and swallows them.
#[derive(Debug, Error)]
pub enum GameError {
    /// Tuning document failed to parse.
    #[error("Failed to parse tuning: {0}")]
    TuningParse(#[from] serde_json::Error),

    /// Tuning parsed but holds values the simulation cannot run with.
    #[error("Invalid tuning value '{field}': {reason}")]
    InvalidTuning {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Palette colour is not a `#rrggbb` string.
    #[error("Invalid palette colour for {part}: '{value}'")]
    InvalidColor {
        /// Palette slot (body, barrel, ...).
        part: &'static str,
        /// Value that failed to parse.
        value: String,
    },

    /// Inbound payload from the host could not be decoded.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Write to the shared room channel failed.
    #[error("Channel operation '{op}' failed: {message}")]
    Channel {
        /// Operation name.
        op: &'static str,
        /// Transport error text.
        message: String,
    },

    /// Channel is not connected (no room joined yet, or already torn down).
    #[error("Channel is not connected")]
    Disconnected,
}
