//! # Collaborators
//!
//! Seams to modules the engine does not own: payment capture and image
//! hosting. Services hold them as `Arc<dyn Trait>` so tests can swap in
//! stubs.
//!
//! ```text
//! RenewalScheduler ──charge()──► PaymentGateway ──► payment module
//! DraftService     ──resolve()─► ImageUrlResolver ──► public bucket URL
//! CatalogService   ──resolve()─┘
//! ```

use async_trait::async_trait;
use petbox_core::Money;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::PaymentError;

// =============================================================================
// Payment
// =============================================================================

/// A request to charge a saved payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub user_id: String,
    /// Opaque payment method reference stored on the plan.
    pub payment_method: String,
    pub amount: Money,
    /// Stable per billing cycle (`{plan_id}:{cycle_key}`).
    pub idempotency_key: String,
}

/// Proof that a charge was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    /// Reference assigned by the payment module.
    pub reference: String,
}

/// Charges saved payment methods.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, PaymentError>;
}

/// Records a charge intent for the external payment module to capture.
///
/// Never fails; the capture outcome is owned downstream.
#[derive(Debug, Clone, Default)]
pub struct DeferredCaptureGateway;

#[async_trait]
impl PaymentGateway for DeferredCaptureGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, PaymentError> {
        let reference = format!("intent_{}", Uuid::new_v4().simple());

        info!(
            user_id = %request.user_id,
            amount = %request.amount,
            idempotency_key = %request.idempotency_key,
            %reference,
            "Charge intent recorded"
        );

        Ok(ChargeReceipt { reference })
    }
}

// =============================================================================
// Images
// =============================================================================

/// Maps a stored image location to a public URL.
pub trait ImageUrlResolver: Send + Sync {
    fn resolve(&self, bucket: &str, path: &str) -> String;
}

/// Public object storage: `{base_url}/{bucket}/{path}`.
#[derive(Debug, Clone)]
pub struct PublicBucketResolver {
    base_url: String,
}

impl PublicBucketResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        PublicBucketResolver {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ImageUrlResolver for PublicBucketResolver {
    fn resolve(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            bucket.trim_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
