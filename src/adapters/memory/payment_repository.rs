//! In-memory payment repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId};
use crate::domain::payment::Payment;
use crate::ports::PaymentRepository;

#[derive(Debug, Default)]
pub struct InMemoryPaymentRepository {
    payments: RwLock<HashMap<PaymentId, Payment>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a payment, as the payment service would have recorded it.
    pub async fn insert(&self, payment: Payment) {
        self.payments.write().await.insert(payment.id.clone(), payment);
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.payments.read().await.get(id).cloned())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = self.payments.write().await;
        match payments.get_mut(&payment.id) {
            Some(stored) => {
                *stored = payment.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("payment {} not found", payment.id),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Timestamp, UserId};
    use crate::domain::payment::PaymentStatus;
    use serde_json::Map;

    fn payment(id: &str) -> Payment {
        Payment {
            id: PaymentId::new(id).unwrap(),
            user_id: UserId::new("u1").unwrap(),
            subscription_id: None,
            amount: 4900,
            currency: "USD".to_string(),
            status: PaymentStatus::Pending,
            metadata: Map::new(),
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn update_replaces_stored_payment() {
        let repo = InMemoryPaymentRepository::new();
        repo.insert(payment("pay_1")).await;

        let mut p = payment("pay_1");
        p.status = PaymentStatus::Failed;
        repo.update(&p).await.unwrap();

        let stored = repo.find_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn update_unknown_payment_is_not_found() {
        let repo = InMemoryPaymentRepository::new();
        let err = repo.update(&payment("pay_x")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentNotFound);
    }
}
