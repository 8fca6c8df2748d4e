//! Browser automation for LinkedIn.
//!
//! [`BrowserSession`] is the seam between the pipeline and a real browser:
//! the pipeline only needs login, navigation, scrolling and the rendered page
//! source. Element queries run against a [`PageSnapshot`] of that source.

mod chrome;
mod dom;

pub use chrome::{ChromeLauncher, ChromeSession};
pub use dom::{compile_selector, PageSnapshot};

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// LinkedIn login page.
pub const DEFAULT_LOGIN_URL: &str = "https://www.linkedin.com/login";

/// Element that only renders for an authenticated member.
pub const DEFAULT_AUTHENTICATED_MARKER: &str = "#global-nav";

/// Desktop Chrome user agent presented instead of the headless default.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Login identity for the browser session. Never persisted.
#[derive(Clone)]
pub struct Credential {
    pub identity: String,
    pub secret: String,
}

impl Credential {
    #[must_use]
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// How to launch and drive the browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// User agent override.
    pub user_agent: String,
    /// Fixed window size.
    pub window_size: (u32, u32),
    /// Login page URL.
    pub login_url: String,
    /// Selector that only matches once logged in.
    pub authenticated_marker: String,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window_size: (1920, 1080),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            authenticated_marker: DEFAULT_AUTHENTICATED_MARKER.to_string(),
        }
    }
}

/// A live, automatable browser.
///
/// All calls block the worker until the browser answers. Implementations must
/// tolerate `close` being called more than once.
#[async_trait]
pub trait BrowserSession: Send {
    /// Open the login surface, submit `credential` if given, and wait up to
    /// `timeout` for the authenticated marker. Never retries.
    async fn login(&mut self, credential: Option<&Credential>, timeout: Duration) -> Result<()>;

    /// Load `url` in the current tab.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Scroll the page vertically.
    async fn scroll_by(&mut self, pixels: i64) -> Result<()>;

    /// HTML of the currently rendered DOM.
    async fn page_source(&mut self) -> Result<String>;

    /// Release the browser process.
    async fn close(&mut self) -> Result<()>;
}

/// Opens a fresh [`BrowserSession`] for each supervisor run.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_redacts_secret() {
        let credential = Credential::new("me@example.com", "hunter2");
        let debug = format!("{credential:?}");
        assert!(debug.contains("me@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
