use tracing::{info, instrument};

use super::dto::MealLogged;
use crate::ledger::{LedgerError, Standing};
use crate::state::AppState;
use crate::storage::StoreError;
use crate::vision::{AnalysisFailure, MealEstimate};

#[derive(Debug, thiserror::Error)]
pub enum MealError {
    #[error("meal analysis unavailable: {0}")]
    Analysis(#[from] AnalysisFailure),
    /// The photo was understood but there is no goal to count it against.
    #[error("no daily goal configured")]
    NoGoalConfigured { estimate: MealEstimate },
    /// The meal is counted in memory but the snapshot write failed.
    #[error("meal counted but snapshot could not be saved: {source}")]
    NotDurable {
        logged: MealLogged,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Photo → estimate → ledger. A failed analysis never touches the ledger.
#[instrument(skip(st))]
pub async fn log_meal_photo(
    st: &AppState,
    user_id: i64,
    image_url: &str,
) -> Result<MealLogged, MealError> {
    let estimate = st.analyzer.analyze(image_url).await?;

    let standing = match st.ledger.record_consumption(user_id, estimate.calories).await {
        Ok(standing) => standing,
        Err(LedgerError::Persist {
            progress: Some(progress),
            source,
        }) => {
            return Err(MealError::NotDurable {
                logged: MealLogged { estimate, progress },
                source,
            })
        }
        Err(e) => return Err(e.into()),
    };

    match standing {
        Standing::Tracking(progress) => {
            info!(
                user_id,
                calories = estimate.calories,
                remaining = progress.remaining_kcal,
                "meal logged"
            );
            Ok(MealLogged { estimate, progress })
        }
        Standing::NoGoalConfigured => Err(MealError::NoGoalConfigured { estimate }),
    }
}
