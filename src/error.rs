//! Error handling for binaural sessions
//!
//! Every error carries a stable code and, where it makes sense, recovery
//! suggestions that a UI can show next to the message.

use thiserror::Error;

/// Result type alias for binaural operations
pub type Result<T> = std::result::Result<T, BinauralError>;

/// Main error type for session, playback and export operations
#[derive(Error, Debug)]
pub enum BinauralError {
    // Validation Errors
    #[error("No valid segments in instructions")]
    EmptySession,

    #[error("Invalid timeline: {reason}")]
    InvalidTimeline { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Session too long: {duration_secs:.0}s does not fit in a single file")]
    SessionTooLong { duration_secs: f64 },

    // Playback Errors
    #[error("Voice teardown failed: {reason}")]
    VoiceTeardown { reason: String },

    // Render Errors
    #[error("Offline render failed: {reason}")]
    RenderFailed { reason: String },

    #[error("Render window out of range: {start_secs:.3}s + {duration_secs:.3}s")]
    InvalidRenderWindow { start_secs: f64, duration_secs: f64 },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BinauralError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            BinauralError::EmptySession => "EMPTY_SESSION",
            BinauralError::InvalidTimeline { .. } => "INVALID_TIMELINE",
            BinauralError::InvalidConfig { .. } => "INVALID_CONFIG",
            BinauralError::SessionTooLong { .. } => "SESSION_TOO_LONG",
            BinauralError::VoiceTeardown { .. } => "VOICE_TEARDOWN",
            BinauralError::RenderFailed { .. } => "RENDER_FAILED",
            BinauralError::InvalidRenderWindow { .. } => "INVALID_RENDER_WINDOW",
            BinauralError::Io(_) => "IO_ERROR",
            BinauralError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the caller in a state where the same request
    /// can be retried after the user changes something.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BinauralError::EmptySession
                | BinauralError::SessionTooLong { .. }
                | BinauralError::VoiceTeardown { .. }
                | BinauralError::RenderFailed { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BinauralError::EmptySession => vec![
                "Use tokens like '4hz 30min' or '10 to 7hz 1 hr'",
                "Separate segments with commas",
                "Durations must use 'hr' or 'min'",
            ],
            BinauralError::SessionTooLong { .. } => vec![
                "Enable split_files to export multiple parts",
                "Shorten the session",
            ],
            BinauralError::RenderFailed { .. } => vec![
                "Try a smaller duration",
                "Lower the chunk length in the configuration",
            ],
            BinauralError::InvalidConfig { .. } => vec![
                "Check the configuration file against the defaults",
                "Remove the field to fall back to its default value",
            ],
            _ => vec![],
        }
    }

    /// Get a user-friendly message for this error
    ///
    /// Render failures use the export status wording shown to users.
    pub fn friendly_message(&self) -> String {
        match self {
            BinauralError::EmptySession => {
                "Please enter at least one valid segment, e.g. '10 to 7hz 1 hr, 4hz 30min'."
                    .to_string()
            }
            BinauralError::RenderFailed { reason } => {
                format!("Error: {}. Try smaller duration.", reason)
            }
            _ => self.to_string(),
        }
    }
}
