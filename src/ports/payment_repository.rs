//! Payment repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId};
use crate::domain::payment::Payment;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    /// Persists status and metadata changes.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if the payment does not exist
    async fn update(&self, payment: &Payment) -> Result<(), DomainError>;
}
