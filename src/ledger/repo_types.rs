use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Goal and running total for one chat user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserLedgerEntry {
    /// `None` until the user sets a goal. Zero is a real goal.
    pub daily_goal_kcal: Option<u32>,
    pub consumed_kcal: u64,
}

/// Full ledger state, the only thing ever written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SnapshotFile", into = "SnapshotFile")]
pub struct LedgerSnapshot {
    pub entries: BTreeMap<i64, UserLedgerEntry>,
}

impl LedgerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// On-disk layout: two parallel maps keyed by the stringified user id.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile {
    #[serde(default)]
    daily_calorie_limit: BTreeMap<i64, u32>,
    #[serde(default)]
    calories_consumed: BTreeMap<i64, u64>,
}

impl From<SnapshotFile> for LedgerSnapshot {
    fn from(f: SnapshotFile) -> Self {
        let mut entries: BTreeMap<i64, UserLedgerEntry> = BTreeMap::new();
        for (user_id, goal) in f.daily_calorie_limit {
            entries.entry(user_id).or_default().daily_goal_kcal = Some(goal);
        }
        for (user_id, consumed) in f.calories_consumed {
            entries.entry(user_id).or_default().consumed_kcal = consumed;
        }
        Self { entries }
    }
}

impl From<LedgerSnapshot> for SnapshotFile {
    fn from(s: LedgerSnapshot) -> Self {
        let mut f = SnapshotFile::default();
        for (user_id, e) in s.entries {
            if let Some(goal) = e.daily_goal_kcal {
                f.daily_calorie_limit.insert(user_id, goal);
            }
            f.calories_consumed.insert(user_id, e.consumed_kcal);
        }
        f
    }
}
