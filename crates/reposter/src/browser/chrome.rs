//! Chromium session driven over CDP with chromiumoxide.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{BrowserLauncher, BrowserSession, Credential, LaunchOptions};
use crate::error::{AgentError, Result};

const USERNAME_SELECTOR: &str = "#username";
const PASSWORD_SELECTOR: &str = "#password";
const SUBMIT_SELECTOR: &str = "button[type='submit']";

/// How often the login wait re-checks for the authenticated marker.
const LOGIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A launched Chromium with one tab.
pub struct ChromeSession {
    options: LaunchOptions,
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
}

impl ChromeSession {
    /// Launch Chromium with automation fingerprints toned down.
    pub async fn open(options: &LaunchOptions) -> Result<Self> {
        let (width, height) = options.window_size;
        tracing::info!(headless = options.headless, width, height, "Launching browser");

        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox") // Required for containerized environments
            .arg("--disable-dev-shm-usage") // Avoid /dev/shm size issues in containers
            .arg("--disable-gpu")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", options.user_agent))
            .arg(format!("--window-size={width},{height}"))
            .window_size(width, height)
            .viewport(None);
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| AgentError::Launch(format!("Failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AgentError::Launch(e.to_string()))?;

        // Spawn handler task
        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let mut session = Self {
                    options: options.clone(),
                    browser: Some(browser),
                    page: None,
                    handler: Some(handle),
                };
                let _ = session.close().await;
                return Err(AgentError::Launch(format!("Failed to open tab: {e}")));
            }
        };

        Ok(Self {
            options: options.clone(),
            browser: Some(browser),
            page: Some(page),
            handler: Some(handle),
        })
    }

    fn page(&self) -> Result<Page> {
        self.page.clone().ok_or(AgentError::SessionClosed)
    }

    async fn field(page: &Page, selector: &str) -> Result<Element> {
        page.find_element(selector)
            .await
            .map_err(|_| AgentError::ElementNotFound(selector.to_string()))
    }

    async fn submit_credential(page: &Page, credential: &Credential) -> Result<()> {
        let username = Self::field(page, USERNAME_SELECTOR).await?;
        username.click().await?.type_str(&credential.identity).await?;

        let password = Self::field(page, PASSWORD_SELECTOR).await?;
        password.click().await?.type_str(&credential.secret).await?;

        Self::field(page, SUBMIT_SELECTOR).await?.click().await?;
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn login(&mut self, credential: Option<&Credential>, timeout: Duration) -> Result<()> {
        let page = self.page()?;
        page.goto(self.options.login_url.as_str()).await?;

        match credential {
            Some(credential) => {
                tracing::info!(identity = %credential.identity, "Submitting login form");
                if let Err(e) = Self::submit_credential(&page, credential).await {
                    // A checkpoint page or changed form can still be completed by hand.
                    tracing::warn!(error = %e, "Could not submit login form, waiting for manual login");
                }
            }
            None => tracing::info!("No credential supplied, waiting for manual login"),
        }

        let marker = self.options.authenticated_marker.as_str();
        let wait_for_marker = async {
            while page.find_element(marker).await.is_err() {
                tokio::time::sleep(LOGIN_POLL_INTERVAL).await;
            }
        };

        if tokio::time::timeout(timeout, wait_for_marker).await.is_err() {
            tracing::error!(?timeout, marker, "Login not completed");
            return Err(AgentError::LoginTimeout(timeout));
        }

        tracing::info!("Login successful");
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        tracing::debug!(url, "Navigating");
        self.page()?.goto(url).await?;
        Ok(())
    }

    async fn scroll_by(&mut self, pixels: i64) -> Result<()> {
        let script = format!("window.scrollBy(0, {pixels})");
        self.page()?.evaluate(script.as_str()).await?;
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        let html = self.page()?.content().await?;
        tracing::debug!(len = html.len(), "Got page content");
        Ok(html)
    }

    async fn close(&mut self) -> Result<()> {
        self.page = None;
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let closed = browser.close().await;
        if let Some(handle) = self.handler.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Browser handler task failed");
            }
        }
        closed?;

        tracing::info!("Browser closed");
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if self.browser.is_some() {
            tracing::warn!("Browser session dropped without close");
        }
    }
}

/// Launches a [`ChromeSession`] per supervisor run.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    options: LaunchOptions,
}

impl ChromeLauncher {
    #[must_use]
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserSession>> {
        Ok(Box::new(ChromeSession::open(&self.options).await?))
    }
}
