//! Shared fixtures: a scripted browser and search-results markup.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reposter::browser::{BrowserLauncher, BrowserSession, Credential};
use reposter::error::{AgentError, Result};
use reposter::finder::FinderConfig;

/// One search result card in LinkedIn feed markup.
pub fn card(id: &str, author: &str, text: &str, reactions: u64, comments: u64) -> String {
    card_with_image(id, author, text, reactions, comments, None)
}

pub fn card_with_image(
    id: &str,
    author: &str,
    text: &str,
    reactions: u64,
    comments: u64,
    image: Option<&str>,
) -> String {
    let image = image
        .map(|src| format!(r#"<div class="update-components-image"><img src="{src}"></div>"#))
        .unwrap_or_default();
    format!(
        r#"<div class="feed-shared-update-v2" data-urn="{id}">
  <span class="update-components-actor__name">{author}</span>
  <div class="update-components-text">{text}</div>
  {image}
  <span class="social-details-social-counts__reactions-count">{reactions}</span>
  <button class="social-details-social-counts__comments">{comments} comments</button>
</div>"#
    )
}

pub fn results_page(cards: &[String]) -> String {
    format!("<html><body><main>{}</main></body></html>", cards.join("\n"))
}

/// Results page scored [5, 12, 3] in page order.
pub fn three_post_page() -> String {
    results_page(&[
        card("urn:li:activity:1", "Ada", "Five", 4, 1),
        card("urn:li:activity:2", "Grace", "Twelve", 10, 2),
        card("urn:li:activity:3", "Linus", "Three", 3, 0),
    ])
}

/// Finder without settle waits.
pub fn fast_finder() -> FinderConfig {
    FinderConfig {
        initial_settle: Duration::ZERO,
        scroll_cycles: 1,
        scroll_settle: Duration::ZERO,
        ..FinderConfig::default()
    }
}

/// Counters shared between a fake browser and the test.
#[derive(Debug, Default)]
pub struct BrowserCalls {
    pub opens: AtomicUsize,
    pub logins: AtomicUsize,
    pub navigations: AtomicUsize,
    pub closes: AtomicUsize,
}

impl BrowserCalls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Browser that serves fixed HTML.
pub struct FakeBrowser {
    html: String,
    login_ok: bool,
    navigate_delay: Duration,
    calls: Arc<BrowserCalls>,
}

impl FakeBrowser {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            login_ok: true,
            navigate_delay: Duration::ZERO,
            calls: Arc::new(BrowserCalls::default()),
        }
    }

    pub fn calls(&self) -> Arc<BrowserCalls> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn login(&mut self, _credential: Option<&Credential>, timeout: Duration) -> Result<()> {
        self.calls.logins.fetch_add(1, Ordering::SeqCst);
        if self.login_ok {
            Ok(())
        } else {
            Err(AgentError::LoginTimeout(timeout))
        }
    }

    async fn navigate(&mut self, _url: &str) -> Result<()> {
        self.calls.navigations.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.navigate_delay).await;
        Ok(())
    }

    async fn scroll_by(&mut self, _pixels: i64) -> Result<()> {
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out [`FakeBrowser`]s that all report into one set of counters.
pub struct FakeLauncher {
    pub html: String,
    pub login_ok: bool,
    pub launch_ok: bool,
    pub navigate_delay: Duration,
    pub calls: Arc<BrowserCalls>,
}

impl FakeLauncher {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            login_ok: true,
            launch_ok: true,
            navigate_delay: Duration::ZERO,
            calls: Arc::new(BrowserCalls::default()),
        }
    }

    pub fn failing_login(mut self) -> Self {
        self.login_ok = false;
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.launch_ok = false;
        self
    }

    /// Every navigation blocks for `delay`, keeping a cycle in flight.
    pub fn slow_navigation(mut self, delay: Duration) -> Self {
        self.navigate_delay = delay;
        self
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserSession>> {
        self.calls.opens.fetch_add(1, Ordering::SeqCst);
        if !self.launch_ok {
            return Err(AgentError::Launch("no chrome in test".to_string()));
        }
        Ok(Box::new(FakeBrowser {
            html: self.html.clone(),
            login_ok: self.login_ok,
            navigate_delay: self.navigate_delay,
            calls: Arc::clone(&self.calls),
        }))
    }
}
