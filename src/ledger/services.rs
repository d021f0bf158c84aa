use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::dto::Progress;
use super::repo_types::{LedgerSnapshot, UserLedgerEntry};
use crate::storage::{SnapshotStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid goal {input:?}: expected a non-negative whole number of kcal")]
    InvalidGoal { input: String },
    /// The in-memory change stands; only the snapshot write failed.
    /// `progress` is the state the change produced, if it was a user update.
    #[error("ledger updated but snapshot could not be saved: {source}")]
    Persist {
        progress: Option<Progress>,
        #[source]
        source: StoreError,
    },
}

/// Where a user stands against their goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    NoGoalConfigured,
    Tracking(Progress),
}

pub(crate) fn parse_goal(raw: &str) -> Result<u32, LedgerError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| LedgerError::InvalidGoal {
            input: raw.to_string(),
        })
}

/// Per-user goals and running totals. Every mutation is saved before the
/// lock is released, so snapshots hit the store in mutation order.
pub struct Ledger {
    entries: Mutex<HashMap<i64, UserLedgerEntry>>,
    store: Arc<dyn SnapshotStore>,
}

impl Ledger {
    /// Builds the ledger from whatever the store has on disk.
    pub async fn open(store: Arc<dyn SnapshotStore>) -> Self {
        let snapshot = store.load().await;
        if snapshot.is_empty() {
            info!("ledger opened empty");
        } else {
            info!(users = snapshot.len(), "ledger opened");
        }
        Self {
            entries: Mutex::new(snapshot.entries.into_iter().collect()),
            store,
        }
    }

    /// Starts a new epoch: goal replaced, consumption back to zero.
    pub async fn set_goal(&self, user_id: i64, raw_goal: &str) -> Result<Progress, LedgerError> {
        let goal = parse_goal(raw_goal)?;

        let mut entries = self.entries.lock().await;
        entries.insert(
            user_id,
            UserLedgerEntry {
                daily_goal_kcal: Some(goal),
                consumed_kcal: 0,
            },
        );
        let progress = Progress::new(goal, 0);
        self.persist(&entries)
            .await
            .map_err(|source| LedgerError::Persist {
                progress: Some(progress),
                source,
            })?;

        info!(user_id, goal, "daily goal set");
        Ok(progress)
    }

    pub async fn record_consumption(
        &self,
        user_id: i64,
        calories: u32,
    ) -> Result<Standing, LedgerError> {
        let mut entries = self.entries.lock().await;

        let Some(entry) = entries.get_mut(&user_id) else {
            debug!(user_id, calories, "no goal configured; consumption not recorded");
            return Ok(Standing::NoGoalConfigured);
        };
        let Some(goal) = entry.daily_goal_kcal else {
            debug!(user_id, calories, "no goal configured; consumption not recorded");
            return Ok(Standing::NoGoalConfigured);
        };

        entry.consumed_kcal = entry.consumed_kcal.saturating_add(u64::from(calories));
        let progress = Progress::new(goal, entry.consumed_kcal);
        self.persist(&entries)
            .await
            .map_err(|source| LedgerError::Persist {
                progress: Some(progress),
                source,
            })?;

        info!(
            user_id,
            calories,
            consumed = progress.consumed_kcal,
            remaining = progress.remaining_kcal,
            "consumption recorded"
        );
        Ok(Standing::Tracking(progress))
    }

    pub async fn query_status(&self, user_id: i64) -> Standing {
        let entries = self.entries.lock().await;
        match entries.get(&user_id) {
            Some(UserLedgerEntry {
                daily_goal_kcal: Some(goal),
                consumed_kcal,
            }) => Standing::Tracking(Progress::new(*goal, *consumed_kcal)),
            _ => Standing::NoGoalConfigured,
        }
    }

    #[cfg(test)]
    pub async fn snapshot(&self) -> LedgerSnapshot {
        let entries = self.entries.lock().await;
        Self::snapshot_of(&entries)
    }

    /// Final write on shutdown.
    pub async fn flush(&self) -> Result<(), LedgerError> {
        let entries = self.entries.lock().await;
        self.persist(&entries)
            .await
            .map_err(|source| LedgerError::Persist {
                progress: None,
                source,
            })
    }

    fn snapshot_of(entries: &HashMap<i64, UserLedgerEntry>) -> LedgerSnapshot {
        LedgerSnapshot {
            entries: entries.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }

    async fn persist(&self, entries: &HashMap<i64, UserLedgerEntry>) -> Result<(), StoreError> {
        let snapshot = Self::snapshot_of(entries);
        self.store.save(&snapshot).await.inspect_err(|e| {
            error!(error = %e, users = snapshot.len(), "ledger snapshot save failed");
        })
    }
}
