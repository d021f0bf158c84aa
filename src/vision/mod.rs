//! Meal photo → calorie estimate, via an external vision model.

use async_trait::async_trait;
use serde::Serialize;

mod dto;
pub mod openai;

pub use openai::OpenAiVision;

/// What the model thinks is on the plate. Never stored; only `calories`
/// reaches the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealEstimate {
    pub description: String,
    pub calories: u32,
}

/// Any reason the provider could not give a usable estimate. Callers treat
/// every variant the same; the variant only feeds the logs.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisFailure {
    #[error("vision request timed out")]
    Timeout,
    #[error("vision request failed: {0}")]
    Transport(String),
    #[error("vision provider returned status {0}")]
    Status(u16),
    #[error("vision reply envelope malformed: {0}")]
    Envelope(String),
    #[error("vision reply had no JSON object")]
    NoPayload,
    #[error("vision reply payload invalid: {0}")]
    Payload(String),
}

#[async_trait]
pub trait PhotoAnalyzer: Send + Sync {
    /// One attempt, no retries. `image_url` must be fetchable by the provider.
    async fn analyze(&self, image_url: &str) -> Result<MealEstimate, AnalysisFailure>;
}
