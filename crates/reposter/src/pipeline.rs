//! Repost pipeline - one discover, dedup, publish, record cycle.

use chrono::{DateTime, Utc};

use crate::browser::BrowserSession;
use crate::error::Result;
use crate::finder::{Candidate, CandidateFinder};
use crate::history::{EngagementHistory, EngagementRecord, HistoryStore};
use crate::publisher::{compose_text, ContentPublisher};
use crate::quota::{QuotaState, RateLimiter};

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Daily cap reached; nothing was searched or published.
    QuotaExhausted,
    /// The search yielded no eligible item.
    NoCandidate,
    /// The item was republished and recorded.
    Published {
        post_id: String,
        score: u64,
        with_image: bool,
    },
    /// The API did not create the post.
    Rejected { post_id: String },
}

/// Owns the per-session state the worker mutates: history and quota.
pub struct RepostPipeline {
    query: String,
    access_token: String,
    finder: CandidateFinder,
    publisher: ContentPublisher,
    history: HistoryStore,
    limiter: RateLimiter,
    quota: QuotaState,
}

impl RepostPipeline {
    /// Create a pipeline with a fresh quota window.
    #[must_use]
    pub fn new(
        query: impl Into<String>,
        access_token: impl Into<String>,
        finder: CandidateFinder,
        publisher: ContentPublisher,
        history: HistoryStore,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            query: query.into(),
            access_token: access_token.into(),
            finder,
            publisher,
            history,
            limiter,
            quota: QuotaState::new(Utc::now()),
        }
    }

    /// Replace the quota state, e.g. to resume a partially used window.
    #[must_use]
    pub fn with_quota(mut self, quota: QuotaState) -> Self {
        self.quota = quota;
        self
    }

    pub fn history(&self) -> &EngagementHistory {
        self.history.history()
    }

    pub fn quota(&self) -> QuotaState {
        self.quota
    }

    /// Run one cycle against the current clock.
    pub async fn run_cycle(&mut self, browser: &mut dyn BrowserSession) -> Result<CycleOutcome> {
        self.run_cycle_at(browser, Utc::now()).await
    }

    /// Run one cycle as of `now`.
    pub async fn run_cycle_at(
        &mut self,
        browser: &mut dyn BrowserSession,
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome> {
        if self.limiter.should_skip(&mut self.quota, now) {
            tracing::info!(
                posts_today = self.quota.posts_today,
                cap = self.limiter.cap(),
                "Daily cap reached, skipping cycle"
            );
            return Ok(CycleOutcome::QuotaExhausted);
        }

        let excluded = self.history.history().post_ids();
        let Some(candidate) = self
            .finder
            .find_best(browser, &self.query, &excluded)
            .await?
        else {
            return Ok(CycleOutcome::NoCandidate);
        };

        let asset = match candidate.image_url.as_deref() {
            Some(url) => self.upload_image(url).await?,
            None => None,
        };

        let published = self
            .publisher
            .publish(&compose_text(&candidate), asset.as_deref(), &self.access_token)
            .await?;
        if !published {
            return Ok(CycleOutcome::Rejected {
                post_id: candidate.id,
            });
        }

        self.record(&candidate);
        Ok(CycleOutcome::Published {
            score: candidate.score(),
            with_image: asset.is_some(),
            post_id: candidate.id,
        })
    }

    /// Download and upload the candidate image. A failed download or upload
    /// degrades to a text-only post; a rejected token aborts the cycle.
    async fn upload_image(&self, url: &str) -> Result<Option<String>> {
        let Some(image) = self.publisher.download_image(url).await else {
            return Ok(None);
        };
        let user_id = self.publisher.resolve_identity(&self.access_token).await?;
        Ok(self
            .publisher
            .upload_image(image, &user_id, &self.access_token)
            .await)
    }

    fn record(&mut self, candidate: &Candidate) {
        let record = EngagementRecord::now(&candidate.id, &candidate.author);
        if let Err(e) = self.history.append(record) {
            tracing::error!(post_id = %candidate.id, error = %e, "Failed to persist history");
        }
        self.limiter.record_post(&mut self.quota);

        tracing::info!(
            post_id = %candidate.id,
            author = %candidate.author,
            score = candidate.score(),
            posts_today = self.quota.posts_today,
            remaining = self.limiter.remaining(&self.quota),
            "Reposted"
        );
    }
}
