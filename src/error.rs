//! Error types for sail-hal

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the link, codec and driver layers
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Device (serial port or gpsd) could not be reached at construction
    #[error("Cannot connect to {target}: {reason}")]
    Connection {
        /// Port path or socket address that was being opened
        target: String,
        /// Underlying failure description
        reason: String,
    },

    /// Command would overflow the microcontroller input buffer
    #[error("Command {command:?} is {len} bytes encoded, limit is {limit}", limit = crate::link::MAX_COMMAND_LEN)]
    CommandTooLong {
        /// Command text without terminator
        command: String,
        /// Encoded length including terminator
        len: usize,
    },

    /// I/O error on an established connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No response line before the read timeout
    #[error("Timed out waiting for response")]
    Timeout,

    /// Response line was unparsable or lacked the expected field
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid or unreadable rig configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Protocol(err.to_string())
    }
}

impl Error {
    pub(crate) fn connection(target: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Connection {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}
