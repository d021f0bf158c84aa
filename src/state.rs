use crate::config::AppConfig;
use crate::ledger::Ledger;
use crate::storage::{JsonFileStore, SnapshotStore};
use crate::vision::{OpenAiVision, PhotoAnalyzer};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ledger: Arc<Ledger>,
    pub analyzer: Arc<dyn PhotoAnalyzer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = Arc::new(JsonFileStore::new(&config.ledger_path)) as Arc<dyn SnapshotStore>;
        let ledger = Arc::new(Ledger::open(store).await);

        let analyzer = Arc::new(OpenAiVision::new(&config.vision)?) as Arc<dyn PhotoAnalyzer>;

        Ok(Self::from_parts(config, ledger, analyzer))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        ledger: Arc<Ledger>,
        analyzer: Arc<dyn PhotoAnalyzer>,
    ) -> Self {
        Self {
            config,
            ledger,
            analyzer,
        }
    }

    #[cfg(test)]
    pub async fn fake() -> Self {
        let analyzer = Arc::new(test_support::ScriptedAnalyzer::ok(500, "Fake meal"));
        test_support::state_with(analyzer).await.0
    }
}
