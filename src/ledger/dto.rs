use serde::{Deserialize, Serialize};

/// Consumption against the current goal. `remaining_kcal` goes negative
/// once the goal is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub daily_goal_kcal: u32,
    pub consumed_kcal: u64,
    pub remaining_kcal: i64,
}

impl Progress {
    pub fn new(goal: u32, consumed: u64) -> Self {
        let consumed_signed = i64::try_from(consumed).unwrap_or(i64::MAX);
        Self {
            daily_goal_kcal: goal,
            consumed_kcal: consumed,
            remaining_kcal: i64::from(goal).saturating_sub(consumed_signed),
        }
    }
}

/// Request body for PUT /users/:user_id/goal. `goal` is whatever the chat
/// command carried; the ledger decides whether it is a valid goal.
#[derive(Debug, Deserialize)]
pub struct SetGoalRequest {
    #[serde(default)]
    pub goal: serde_json::Value,
}

impl SetGoalRequest {
    /// Text as given; any other JSON value as its JSON text (`null`, `true`),
    /// which the goal parser then rejects.
    pub fn raw_goal(&self) -> String {
        match &self.goal {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn goal_accepts_text_or_number() {
        let text: SetGoalRequest = serde_json::from_str(r#"{"goal":"2000"}"#).unwrap();
        assert_eq!(text.raw_goal(), "2000");

        let num: SetGoalRequest = serde_json::from_str(r#"{"goal":-5}"#).unwrap();
        assert_eq!(num.raw_goal(), "-5");

        let float: SetGoalRequest = serde_json::from_str(r#"{"goal":12.5}"#).unwrap();
        assert_eq!(float.raw_goal(), "12.5");
    }

    #[test]
    fn any_goal_shape_deserializes() {
        for body in [r#"{"goal":null}"#, r#"{"goal":true}"#, r#"{"goal":{}}"#, "{}"] {
            let req: SetGoalRequest = serde_json::from_str(body).unwrap();
            assert!(req.raw_goal().trim().parse::<u32>().is_err(), "{body}");
        }
    }

    #[test]
    fn progress_serialization() {
        let json = serde_json::to_value(Progress::new(100, 150)).unwrap();
        assert_eq!(json["daily_goal_kcal"], 100);
        assert_eq!(json["consumed_kcal"], 150);
        assert_eq!(json["remaining_kcal"], -50);
    }
}
