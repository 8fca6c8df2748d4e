//! Error types for the reposter agent.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the discovery/publish pipeline and its collaborators.
///
/// Only [`AgentError::Launch`] and [`AgentError::LoginTimeout`] end a worker;
/// everything else is logged and the next scheduled cycle tries again.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The browser process could not be started
    #[error("Browser failed to launch: {0}")]
    Launch(String),

    /// The authenticated-only marker never appeared
    #[error("Login not completed within {0:?}")]
    LoginTimeout(Duration),

    /// An expected page element was absent
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The browser session was already closed
    #[error("Browser session is closed")]
    SessionClosed,

    /// The platform API rejected the access token
    #[error("Access token rejected: {0}")]
    Auth(String),

    /// The history file could not be written
    #[error("Failed to persist history to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The platform answered with a status the operation does not accept
    #[error("{operation} returned HTTP {status}")]
    UnexpectedStatus { operation: &'static str, status: u16 },

    /// The platform answered 2xx with a body missing required fields
    #[error("Malformed response: {0}")]
    MalformedResponse(&'static str),

    /// A configured CSS selector does not parse
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// A configured URL does not parse
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Chrome DevTools protocol failure
    #[error("Browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Local I/O failure outside the history file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = AgentError> = std::result::Result<T, E>;
