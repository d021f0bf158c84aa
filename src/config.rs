use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Where the user shops; steers package-size guesses in the prompt.
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub ledger_path: PathBuf,
    pub vision: VisionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let ledger_path = std::env::var("LEDGER_PATH")
            .unwrap_or_else(|_| "data/ledger.json".into())
            .into();
        let vision = VisionConfig {
            api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            base_url: std::env::var("VISION_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            model: std::env::var("VISION_MODEL").unwrap_or_else(|_| "gpt-4-turbo".into()),
            max_tokens: std::env::var("VISION_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(300),
            timeout_secs: std::env::var("VISION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60),
            region: std::env::var("PROMPT_REGION").unwrap_or_else(|_| "Germany".into()),
        };
        Ok(Self { ledger_path, vision })
    }
}
