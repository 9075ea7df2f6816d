use async_trait::async_trait;

use crate::models::*;

/// The operating system store framework, as seen by the purchase translator.
///
/// Implementations forward each call to the native API and report what the
/// platform said without interpreting it. Any `Err` they return is surfaced to
/// the caller as a platform error.
#[async_trait]
pub trait PlatformStore: Send + Sync {
    /// Whether the running OS version ships the purchase API at all.
    async fn is_billing_supported(&self) -> crate::Result<bool>;

    /// Catalog lookup. Identifiers the store does not know are simply absent
    /// from the returned list.
    async fn products(&self, product_ids: &[String]) -> crate::Result<Vec<Product>>;

    async fn purchase(&self, product: &Product, quantity: u32) -> crate::Result<PurchaseOutcome>;

    /// Marks a transaction as processed so the store stops redelivering it.
    async fn finish_transaction(&self, transaction_id: &str) -> crate::Result<FinishStatus>;

    /// Resynchronizes the purchase history with the store backend.
    async fn sync_purchases(&self) -> crate::Result<()>;

    /// Identifiers of transactions still waiting in the local queue.
    async fn unfinished_transactions(&self) -> crate::Result<Vec<String>>;
}
