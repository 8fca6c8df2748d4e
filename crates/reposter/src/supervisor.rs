//! Run-loop supervisor: owns one background worker and its lifecycle.
//!
//! ```text
//! Idle --start--> Running --stop--> Stopping --worker exits--> Idle
//!                    |
//!                    +--launch/login failure--> Idle
//! ```
//!
//! The worker exclusively owns the browser, history and quota. The only
//! shared state is the [`SessionState`] channel and the cancellation token.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::browser::{BrowserLauncher, BrowserSession, Credential};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::finder::CandidateFinder;
use crate::history::HistoryStore;
use crate::pipeline::RepostPipeline;
use crate::publisher::ContentPublisher;
use crate::quota::RateLimiter;

/// Lifecycle of a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Stopping,
}

/// Per-session inputs handed over by the control surface.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub access_token: String,
    pub search_keyword: String,
    /// `None` leaves login to a human at the browser window.
    pub credential: Option<Credential>,
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives the repost pipeline on a fixed interval in a background task.
pub struct Supervisor {
    params: SessionParams,
    config: AgentConfig,
    launcher: Arc<dyn BrowserLauncher>,
    publisher: ContentPublisher,
    state: Arc<watch::Sender<SessionState>>,
    worker: Mutex<Option<Worker>>,
}

impl Supervisor {
    pub fn new(
        params: SessionParams,
        config: AgentConfig,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Result<Self> {
        let mut publisher = ContentPublisher::new(config.api_base.clone())?;
        if let Some(dir) = &config.temp_dir {
            publisher = publisher.with_temp_dir(dir);
        }

        Ok(Self {
            params,
            config,
            launcher,
            publisher,
            state: Arc::new(watch::Sender::new(SessionState::Idle)),
            worker: Mutex::new(None),
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Spawn the worker. Returns false if a worker is already active.
    pub async fn start(&self) -> bool {
        let mut slot = self.worker.lock().await;

        let claimed = self.state.send_if_modified(|state| {
            if *state == SessionState::Idle {
                *state = SessionState::Running;
                true
            } else {
                false
            }
        });
        if !claimed {
            tracing::warn!(state = ?self.state(), "Start ignored, worker already active");
            return false;
        }

        let cancel = CancellationToken::new();
        let run = WorkerRun {
            params: self.params.clone(),
            config: self.config.clone(),
            launcher: Arc::clone(&self.launcher),
            publisher: self.publisher.clone(),
            state: Arc::clone(&self.state),
        };
        let handle = tokio::spawn(run.run(cancel.clone()));
        *slot = Some(Worker { cancel, handle });

        tracing::info!(keyword = %self.params.search_keyword, "Supervisor started");
        true
    }

    /// Signal the worker and wait up to the stop timeout for it to join.
    ///
    /// Returns false if no worker was running. A cycle already in flight is
    /// not interrupted, so the browser may still be open when this returns.
    pub async fn stop(&self) -> bool {
        let claimed = self.state.send_if_modified(|state| {
            if *state == SessionState::Running {
                *state = SessionState::Stopping;
                true
            } else {
                false
            }
        });
        if !claimed {
            tracing::warn!(state = ?self.state(), "Stop ignored, no running worker");
            return false;
        }

        let Some(Worker { cancel, mut handle }) = self.worker.lock().await.take() else {
            return true;
        };
        cancel.cancel();

        match tokio::time::timeout(self.config.stop_timeout, &mut handle).await {
            Ok(Ok(())) => tracing::info!("Supervisor stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Worker task failed"),
            Err(_) => tracing::warn!(
                timeout = ?self.config.stop_timeout,
                "Worker still finishing its cycle, it will release the browser when done"
            ),
        }
        true
    }
}

/// Settles the state to `Idle` however the worker exits, panics included.
struct IdleOnExit(Arc<watch::Sender<SessionState>>);

impl Drop for IdleOnExit {
    fn drop(&mut self) {
        self.0.send_replace(SessionState::Idle);
    }
}

struct WorkerRun {
    params: SessionParams,
    config: AgentConfig,
    launcher: Arc<dyn BrowserLauncher>,
    publisher: ContentPublisher,
    state: Arc<watch::Sender<SessionState>>,
}

impl WorkerRun {
    async fn run(self, cancel: CancellationToken) {
        let _idle = IdleOnExit(Arc::clone(&self.state));

        let mut browser = match self.launcher.open().await {
            Ok(browser) => browser,
            Err(e) => {
                tracing::error!(error = %e, "Could not open browser, worker exiting");
                return;
            }
        };

        match browser
            .login(self.params.credential.as_ref(), self.config.login_timeout)
            .await
        {
            Ok(()) => self.run_loop(browser.as_mut(), &cancel).await,
            Err(e) => tracing::error!(error = %e, "Login failed, worker exiting"),
        }

        if let Err(e) = browser.close().await {
            tracing::warn!(error = %e, "Failed to close browser");
        }
        tracing::info!("Worker exited");
    }

    async fn run_loop(&self, browser: &mut dyn BrowserSession, cancel: &CancellationToken) {
        let mut pipeline = RepostPipeline::new(
            self.params.search_keyword.clone(),
            self.params.access_token.clone(),
            CandidateFinder::new(self.config.finder.clone()),
            self.publisher.clone(),
            HistoryStore::load(&self.config.history_path),
            RateLimiter::new(self.config.daily_cap),
        );

        while !cancel.is_cancelled() {
            match pipeline.run_cycle(browser).await {
                Ok(outcome) => tracing::info!(?outcome, "Cycle complete"),
                Err(e) => tracing::warn!(error = %e, "Cycle failed, retrying next interval"),
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.interval) => {}
            }
        }
        tracing::info!("Run loop cancelled");
    }
}
