use serde::{Deserialize, Serialize};

use crate::ledger::dto::Progress;
use crate::vision::MealEstimate;

/// Request body for POST /users/:user_id/meals. The transport has already
/// resolved its file reference into a URL the provider can fetch.
#[derive(Debug, Deserialize)]
pub struct LogMealRequest {
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealLogged {
    pub estimate: MealEstimate,
    pub progress: Progress,
}
