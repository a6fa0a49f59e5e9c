//! Helpers shared by the application services.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::foundation::{DomainError, ErrorCode, SerializableDomainEvent, UserId};
use crate::ports::EventPublisher;

/// Attempts made at a version-checked read-modify-write before the conflict
/// is reported to the caller.
pub const CONFLICT_RETRY_ATTEMPTS: u32 = 3;

/// Publishes `event`, logging instead of failing when the publisher errors.
pub(crate) async fn publish_best_effort<E>(
    publisher: &dyn EventPublisher,
    event: &E,
    user_id: &UserId,
) where
    E: SerializableDomainEvent,
{
    let envelope = event.to_envelope().with_user_id(user_id.as_str());
    let event_type = envelope.event_type.clone();
    let aggregate_id = envelope.aggregate_id.clone();

    if let Err(error) = publisher.publish(envelope).await {
        warn!(
            event_type = %event_type,
            aggregate_id = %aggregate_id,
            error = %error,
            "failed to publish domain event"
        );
    }
}

/// Runs `attempt` until it stops failing with a version conflict, at most
/// `CONFLICT_RETRY_ATTEMPTS` times. Each attempt must reload the record.
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    operation: &str,
    mut attempt: F,
) -> Result<T, DomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    let mut attempts = 1;
    loop {
        match attempt().await {
            Err(error) if error.is_conflict() && attempts < CONFLICT_RETRY_ATTEMPTS => {
                debug!(operation, attempts, "version conflict, reloading");
                attempts += 1;
            }
            Err(error) if error.is_conflict() => {
                warn!(operation, attempts, "giving up after repeated version conflicts");
                return Err(error.with_detail("attempts", attempts.to_string()));
            }
            other => return other,
        }
    }
}

/// Bounds `future` by `deadline`, reporting expiry as `DeadlineExceeded`.
///
/// Hosts that impose request timeouts wrap service calls in this.
pub async fn with_deadline<T, F>(deadline: Duration, future: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::new(
            ErrorCode::DeadlineExceeded,
            format!("operation did not finish within {}ms", deadline.as_millis()),
        )),
    }
}
