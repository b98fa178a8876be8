use thiserror::Error;

use shopfront_core::DomainError;
use shopfront_storage::StorageError;

use crate::payment::HandoffError;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The command does not apply in the current lifecycle state, or its
    /// input was rejected.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The order record could not be written. The cart is left untouched.
    #[error("order not persisted: {0}")]
    Storage(#[from] StorageError),

    /// The payment link could not be handed to an external app. The attempt
    /// has been rolled back and may be retried.
    #[error(transparent)]
    Handoff(#[from] HandoffError),
}
