//! Port for participant scoring.
//!
//! Context-Aware, Priority-Based and Expertise-Driven strategies read
//! per-participant scores the orchestrator never computes itself. A
//! [`ScoringProvider`] looks at the discussion after each message and
//! returns fresh scores plus any discussion-level analysis.

use async_trait::async_trait;
use colloquy_domain::{Discussion, DiscussionAnalysis, DiscussionMessage, ScoringInputs};
use thiserror::Error;

/// Errors that can occur while scoring
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Scoring backend unavailable: {0}")]
    Unavailable(String),

    #[error("Scoring failed: {0}")]
    Failed(String),
}

/// What a scorer gets to look at
#[derive(Debug, Clone)]
pub struct ScoringRequest {
    pub discussion: Discussion,
    /// Most recent visible messages, oldest first
    pub recent_messages: Vec<DiscussionMessage>,
}

/// What a scorer hands back
#[derive(Debug, Clone, Default)]
pub struct ScoringResult {
    pub scores: ScoringInputs,
    pub analysis: DiscussionAnalysis,
}

impl ScoringResult {
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty() && self.analysis.is_empty()
    }
}

/// Gateway to whatever computes relevance, expertise and engagement.
///
/// Scoring runs off the discussion worker; its result is applied as a
/// separate operation, so a slow or failing scorer never blocks turns.
#[async_trait]
pub trait ScoringProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn score(&self, request: &ScoringRequest) -> Result<ScoringResult, ScoringError>;
}
