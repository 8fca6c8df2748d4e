//! Keyword reposter for LinkedIn.
//!
//! This crate provides:
//! - Browser automation for login and content search (chromiumoxide)
//! - Candidate discovery and engagement scoring over the rendered feed
//! - Republishing through the LinkedIn UGC API, with optional image upload
//! - Engagement history for dedup and a rolling daily post cap
//! - A supervised background run loop with an HTTP control surface

pub mod browser;
pub mod config;
pub mod control;
pub mod error;
pub mod finder;
pub mod history;
pub mod pipeline;
pub mod publisher;
pub mod quota;
pub mod supervisor;

// Re-export main types
pub use browser::{BrowserLauncher, BrowserSession, ChromeLauncher, Credential, LaunchOptions};
pub use config::AgentConfig;
pub use control::{build_router, run_server, ControlState};
pub use error::{AgentError, Result};
pub use finder::{Candidate, CandidateFinder, FinderConfig};
pub use history::{EngagementHistory, EngagementRecord, HistoryStore};
pub use pipeline::{CycleOutcome, RepostPipeline};
pub use publisher::ContentPublisher;
pub use quota::{QuotaState, RateLimiter};
pub use supervisor::{SessionParams, SessionState, Supervisor};
