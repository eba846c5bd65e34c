pub mod mastery;
pub mod planner;
pub mod readiness;
pub mod retention;
pub mod simulator;
pub mod weakness;

use std::future::Future;

use prepmate_algo::ValidationError;

use crate::db::StoreError;

/// Attempts per write before a version conflict is reported to the caller
pub const MAX_CONFLICT_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Run a read-modify-write cycle, re-running it from a fresh read when the
/// conditional write loses to a concurrent writer.
pub async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut cycle: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 1;
    loop {
        match cycle().await {
            Err(ServiceError::Store(StoreError::Conflict { user_id, topic_id }))
                if attempt < MAX_CONFLICT_RETRIES =>
            {
                tracing::warn!(operation, user_id = %user_id, topic_id = %topic_id, attempt, "version conflict, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

pub(crate) fn require_id(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}
