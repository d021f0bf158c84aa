use std::path::PathBuf;

use axum::async_trait;
use tracing::{debug, info, warn};

use crate::ledger::repo_types::LedgerSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialize ledger snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable home of the ledger. Only ever sees whole snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Never fails: a missing or unreadable snapshot is a first run.
    async fn load(&self) -> LedgerSnapshot;
    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError>;
}

/// Pretty-printed JSON file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> LedgerSnapshot {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no ledger snapshot yet; starting empty");
                return LedgerSnapshot::default();
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "ledger snapshot unreadable; starting empty");
                return LedgerSnapshot::default();
            }
        };

        match serde_json::from_slice::<LedgerSnapshot>(&bytes) {
            Ok(snapshot) => {
                info!(path = %self.path.display(), users = snapshot.len(), "ledger snapshot loaded");
                snapshot
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "ledger snapshot malformed; starting empty");
                LedgerSnapshot::default()
            }
        }
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(snapshot)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.io_err(e))?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| self.io_err(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_err(e))?;

        debug!(path = %self.path.display(), users = snapshot.len(), bytes = json.len(), "ledger snapshot saved");
        Ok(())
    }
}
