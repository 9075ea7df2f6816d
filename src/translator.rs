use crate::config::Config;
use crate::error::EMPTY_PRODUCT_IDENTIFIER;
use crate::models::*;
use crate::store::PlatformStore;
use crate::{Error, Result};

/// Version reported to the application layer, fixed at build time.
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Turns platform store results into the plugin's stable result shapes.
///
/// A purchase moves through product lookup and the platform purchase flow,
/// then ends either finalized (verified success only) or failed. Nothing is
/// retried here, every failure is reported once to the caller.
pub struct PurchaseTranslator<S> {
    store: S,
    config: Config,
}

impl<S: PlatformStore> PurchaseTranslator<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    pub fn plugin_version(&self) -> &'static str {
        PLUGIN_VERSION
    }

    pub async fn is_billing_supported(&self) -> bool {
        match self.store.is_billing_supported().await {
            Ok(supported) => supported,
            Err(e) => {
                log::warn!("billing support check failed, reporting unsupported: {e}");
                false
            }
        }
    }

    pub async fn purchase(&self, request: PurchaseRequest) -> Result<TransactionRecord> {
        self.validate(&request)?;
        let PurchaseRequest {
            product_identifier,
            quantity,
        } = request;

        log::debug!("purchase {product_identifier}: looking up product");
        let product = self
            .store
            .products(std::slice::from_ref(&product_identifier))
            .await
            .map_err(into_platform)?
            .into_iter()
            .find(|product| product.identifier == product_identifier)
            .ok_or_else(|| Error::ProductNotFound(product_identifier.clone()))?;

        log::debug!("purchase {product_identifier}: purchasing quantity {quantity}");
        let outcome = self
            .store
            .purchase(&product, quantity)
            .await
            .map_err(into_platform)?;

        self.settle(&product_identifier, outcome).await
    }

    fn validate(&self, request: &PurchaseRequest) -> Result<()> {
        if request.product_identifier.is_empty() {
            return Err(Error::InvalidArgument(EMPTY_PRODUCT_IDENTIFIER.to_string()));
        }
        if request.quantity == 0 || request.quantity > self.config.max_quantity {
            return Err(Error::InvalidArgument(format!(
                "quantity must be between 1 and {}, got {}",
                self.config.max_quantity, request.quantity
            )));
        }
        Ok(())
    }

    /// Maps a store outcome onto the result handed back to the caller.
    ///
    /// A verified purchase whose finalize call fails is reported as a platform
    /// error even though the store already charged it: the transaction stays in
    /// the unfinished queue and the next [`restore`](Self::restore) finalizes
    /// it, so the entitlement is granted then instead of now.
    async fn settle(&self, product_id: &str, outcome: PurchaseOutcome) -> Result<TransactionRecord> {
        match outcome {
            PurchaseOutcome::Verified { transaction } => {
                let status = self
                    .store
                    .finish_transaction(&transaction.transaction_id)
                    .await
                    .map_err(into_platform)?;
                log::debug!(
                    "purchase {product_id}: transaction {} finalized ({status:?})",
                    transaction.transaction_id
                );
                Ok(transaction.into())
            }
            // Left unfinished so a later reconciliation pass can pick it up.
            PurchaseOutcome::Unverified {
                transaction,
                verification_error,
            } => {
                log::warn!(
                    "purchase {product_id}: transaction {} failed verification: {verification_error}",
                    transaction.transaction_id
                );
                Err(Error::VerificationFailed(verification_error))
            }
            PurchaseOutcome::Pending => {
                log::debug!("purchase {product_id}: pending");
                Err(Error::Pending)
            }
            PurchaseOutcome::UserCancelled => {
                log::debug!("purchase {product_id}: cancelled by user");
                Err(Error::Cancelled)
            }
            PurchaseOutcome::Unrecognized => {
                log::warn!("purchase {product_id}: unrecognized store outcome");
                Err(Error::Unknown)
            }
        }
    }

    /// Resyncs the purchase history, then finalizes whatever is still queued.
    pub async fn restore(&self) -> Result<()> {
        log::debug!("restore: syncing purchase history");
        self.store.sync_purchases().await.map_err(into_platform)?;

        let queued = self
            .store
            .unfinished_transactions()
            .await
            .map_err(into_platform)?;
        log::debug!("restore: {} unfinished transaction(s)", queued.len());

        let mut failed = Vec::new();
        let mut first_error = None;
        for transaction_id in queued {
            match self.store.finish_transaction(&transaction_id).await {
                Ok(FinishStatus::Finished) => {
                    log::debug!("restore: finished {transaction_id}");
                }
                Ok(FinishStatus::AlreadyFinished) => {
                    log::debug!("restore: {transaction_id} was already finished");
                }
                Err(e) => {
                    log::warn!("restore: could not finish {transaction_id}: {e}");
                    first_error.get_or_insert_with(|| e.to_string());
                    failed.push(transaction_id);
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(message) => Err(Error::PlatformError(format!(
                "failed to finish transactions {}: {message}",
                failed.join(", ")
            ))),
        }
    }

    /// Looks up the catalog entries for `product_ids`, in request order.
    ///
    /// Unknown identifiers are left out of the result rather than failing the
    /// call.
    pub async fn query_products(&self, product_ids: Vec<String>) -> Result<Vec<Product>> {
        let mut requested: Vec<String> = Vec::with_capacity(product_ids.len());
        for id in product_ids {
            if !requested.contains(&id) {
                requested.push(id);
            }
        }
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let mut found = self
            .store
            .products(&requested)
            .await
            .map_err(into_platform)?;

        let products: Vec<Product> = requested
            .iter()
            .filter_map(|id| {
                let index = found.iter().position(|product| &product.identifier == id)?;
                Some(found.swap_remove(index))
            })
            .collect();
        log::debug!(
            "products: resolved {} of {} identifier(s)",
            products.len(),
            requested.len()
        );
        Ok(products)
    }
}

/// Whatever a store call failed with reaches the caller as a platform error.
fn into_platform(error: Error) -> Error {
    match error {
        Error::PlatformError(_) => error,
        other => Error::platform(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory store that replays a scripted outcome and counts calls.
    #[derive(Default)]
    struct ScriptedStore {
        supported: Option<bool>,
        catalog: Vec<Product>,
        /// Answer lookups with the whole catalog, whatever was asked for.
        whole_catalog: bool,
        outcome: Option<PurchaseOutcome>,
        products_error: Option<String>,
        purchase_error: Option<String>,
        sync_error: Option<String>,
        unfinished_error: Option<String>,
        unfinished: Vec<String>,
        unfinishable: Vec<String>,
        finished: Mutex<Vec<String>>,
        product_calls: AtomicUsize,
        purchase_calls: AtomicUsize,
        finish_calls: AtomicUsize,
    }

    impl ScriptedStore {
        fn with_catalog(ids: &[&str]) -> Self {
            Self {
                catalog: ids.iter().map(|id| product(id)).collect(),
                ..Default::default()
            }
        }

        fn calls(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PlatformStore for ScriptedStore {
        async fn is_billing_supported(&self) -> Result<bool> {
            self.supported
                .ok_or_else(|| Error::platform("StoreKit is unavailable"))
        }

        async fn products(&self, product_ids: &[String]) -> Result<Vec<Product>> {
            self.product_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.products_error {
                return Err(Error::platform(message));
            }
            Ok(self
                .catalog
                .iter()
                .filter(|product| self.whole_catalog || product_ids.contains(&product.identifier))
                .cloned()
                .collect())
        }

        async fn purchase(&self, _product: &Product, _quantity: u32) -> Result<PurchaseOutcome> {
            self.purchase_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.purchase_error {
                return Err(Error::platform(message));
            }
            Ok(self.outcome.clone().unwrap_or(PurchaseOutcome::Unrecognized))
        }

        async fn finish_transaction(&self, transaction_id: &str) -> Result<FinishStatus> {
            self.finish_calls.fetch_add(1, Ordering::SeqCst);
            if self.unfinishable.iter().any(|id| id == transaction_id) {
                return Err(Error::platform("The transaction could not be found."));
            }
            let mut finished = self.finished.lock().unwrap();
            if finished.iter().any(|id| id == transaction_id) {
                return Ok(FinishStatus::AlreadyFinished);
            }
            finished.push(transaction_id.to_string());
            Ok(FinishStatus::Finished)
        }

        async fn sync_purchases(&self) -> Result<()> {
            match &self.sync_error {
                Some(message) => Err(Error::platform(message)),
                None => Ok(()),
            }
        }

        async fn unfinished_transactions(&self) -> Result<Vec<String>> {
            match &self.unfinished_error {
                Some(message) => Err(Error::platform(message)),
                None => Ok(self.unfinished.clone()),
            }
        }
    }

    fn product(id: &str) -> Product {
        Product {
            identifier: id.to_string(),
            title: format!("{id} title"),
            description: String::new(),
            price: 4.99,
            price_string: "$4.99".to_string(),
            currency_code: Some("USD".to_string()),
            product_type: ProductType::AutoRenewable,
            is_family_shareable: Some(false),
            subscription_group_id: None,
            subscription_period: None,
            introductory_offer: None,
        }
    }

    fn translator(store: ScriptedStore) -> PurchaseTranslator<ScriptedStore> {
        PurchaseTranslator::new(store, Config::default())
    }

    fn verified(transaction_id: &str, product_id: &str) -> PurchaseOutcome {
        let purchased = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        PurchaseOutcome::Verified {
            transaction: StoreTransaction::new(transaction_id, product_id, purchased),
        }
    }

    #[tokio::test]
    async fn empty_identifier_is_rejected_before_any_store_call() {
        let translator = translator(ScriptedStore::with_catalog(&["pro_monthly"]));

        let err = translator.purchase(PurchaseRequest::new("")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "productIdentifier is Empty, give an id");
        assert_eq!(ScriptedStore::calls(&translator.store.product_calls), 0);
        assert_eq!(ScriptedStore::calls(&translator.store.purchase_calls), 0);
    }

    #[tokio::test]
    async fn quantity_outside_configured_range_is_rejected() {
        let translator = PurchaseTranslator::new(
            ScriptedStore::with_catalog(&["coins_100"]),
            Config { max_quantity: 5 },
        );

        for quantity in [0, 6] {
            let request = PurchaseRequest {
                product_identifier: "coins_100".to_string(),
                quantity,
            };
            let err = translator.purchase(request).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        assert_eq!(ScriptedStore::calls(&translator.store.product_calls), 0);
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let translator = translator(ScriptedStore::with_catalog(&[]));

        let err = translator
            .purchase(PurchaseRequest::new("pro_monthly"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ProductNotFound(ref id) if id == "pro_monthly"));
        assert_eq!(ScriptedStore::calls(&translator.store.purchase_calls), 0);
    }

    #[tokio::test]
    async fn unrelated_catalog_entries_do_not_match() {
        let mut store = ScriptedStore::with_catalog(&["pro_yearly", "coins_100"]);
        store.whole_catalog = true;
        store.outcome = Some(verified("1", "pro_yearly"));
        let translator = translator(store);

        let err = translator
            .purchase(PurchaseRequest::new("pro_monthly"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ProductNotFound(ref id) if id == "pro_monthly"));
        assert_eq!(ScriptedStore::calls(&translator.store.purchase_calls), 0);
    }

    #[tokio::test]
    async fn catalog_failure_during_purchase_stops_before_buying() {
        let mut store = ScriptedStore::with_catalog(&["pro_monthly"]);
        store.products_error = Some("Cannot connect to iTunes Store".to_string());
        let translator = translator(store);

        let err = translator
            .purchase(PurchaseRequest::new("pro_monthly"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PlatformError);
        assert_eq!(err.to_string(), "Cannot connect to iTunes Store");
        assert_eq!(ScriptedStore::calls(&translator.store.purchase_calls), 0);
    }

    #[tokio::test]
    async fn failed_finalize_of_verified_purchase_is_a_platform_error() {
        let mut store = ScriptedStore::with_catalog(&["pro_monthly"]);
        store.outcome = Some(verified("55", "pro_monthly"));
        store.unfinishable = vec!["55".to_string()];
        let translator = translator(store);

        let err = translator
            .purchase(PurchaseRequest::new("pro_monthly"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PlatformError);
        assert_eq!(err.to_string(), "The transaction could not be found.");
        assert_eq!(ScriptedStore::calls(&translator.store.finish_calls), 1);
    }

    #[tokio::test]
    async fn verified_purchase_is_finalized_once_and_normalized() {
        let mut store = ScriptedStore::with_catalog(&["pro_monthly"]);
        store.outcome = Some(verified("2000000123456789", "pro_monthly"));
        let translator = translator(store);

        let transaction = translator
            .purchase(PurchaseRequest::new("pro_monthly"))
            .await
            .unwrap();

        assert_eq!(ScriptedStore::calls(&translator.store.finish_calls), 1);
        assert_eq!(
            *translator.store.finished.lock().unwrap(),
            vec!["2000000123456789".to_string()]
        );
        let response = serde_json::to_value(PurchaseResponse { transaction }).unwrap();
        assert_eq!(
            response,
            json!({
                "transaction": {
                    "transactionID": "2000000123456789",
                    "productID": "pro_monthly",
                    "purchaseDate": "2024-05-01T12:30:00.000Z"
                }
            })
        );
    }

    #[tokio::test]
    async fn unverified_purchase_is_never_finalized() {
        let mut store = ScriptedStore::with_catalog(&["pro_monthly"]);
        let PurchaseOutcome::Verified { transaction } = verified("9", "pro_monthly") else {
            unreachable!()
        };
        store.outcome = Some(PurchaseOutcome::Unverified {
            transaction,
            verification_error: "The transaction signature is invalid.".to_string(),
        });
        let translator = translator(store);

        let err = translator
            .purchase(PurchaseRequest::new("pro_monthly"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::VerificationFailed);
        assert_eq!(err.to_string(), "The transaction signature is invalid.");
        assert_eq!(ScriptedStore::calls(&translator.store.finish_calls), 0);
    }

    #[tokio::test]
    async fn each_non_success_outcome_maps_to_one_kind() {
        let cases = [
            (PurchaseOutcome::Pending, ErrorKind::Pending),
            (PurchaseOutcome::UserCancelled, ErrorKind::Cancelled),
            (PurchaseOutcome::Unrecognized, ErrorKind::Unknown),
        ];

        for (outcome, kind) in cases {
            let mut store = ScriptedStore::with_catalog(&["coins_100"]);
            store.outcome = Some(outcome);
            let translator = translator(store);

            let err = translator
                .purchase(PurchaseRequest::new("coins_100"))
                .await
                .unwrap_err();

            assert_eq!(err.kind(), kind);
            assert_eq!(ScriptedStore::calls(&translator.store.finish_calls), 0);
        }
    }

    #[tokio::test]
    async fn store_failures_surface_as_platform_errors() {
        let mut store = ScriptedStore::with_catalog(&["coins_100"]);
        store.purchase_error = Some("The network connection was lost.".to_string());
        let translator = translator(store);

        let err = translator
            .purchase(PurchaseRequest::new("coins_100"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PlatformError);
        assert_eq!(err.to_string(), "The network connection was lost.");
    }

    #[test]
    fn non_platform_store_errors_are_rewrapped() {
        let err = into_platform(Error::Cancelled);
        assert_eq!(err.kind(), ErrorKind::PlatformError);
        assert_eq!(err.to_string(), "User cancelled");
    }

    #[tokio::test]
    async fn empty_query_skips_the_store() {
        let translator = translator(ScriptedStore::with_catalog(&["pro_monthly"]));

        let products = translator.query_products(Vec::new()).await.unwrap();

        assert!(products.is_empty());
        assert_eq!(ScriptedStore::calls(&translator.store.product_calls), 0);
        let response = serde_json::to_value(GetProductsResponse { products }).unwrap();
        assert_eq!(response, json!({ "products": [] }));
    }

    #[tokio::test]
    async fn query_keeps_resolvable_subset_in_request_order() {
        let translator = translator(ScriptedStore::with_catalog(&[
            "pro_yearly",
            "coins_100",
            "pro_monthly",
        ]));

        let products = translator
            .query_products(vec![
                "pro_monthly".to_string(),
                "does_not_exist".to_string(),
                "coins_100".to_string(),
                "pro_monthly".to_string(),
            ])
            .await
            .unwrap();

        let ids: Vec<&str> = products.iter().map(|p| p.identifier.as_str()).collect();
        assert_eq!(ids, ["pro_monthly", "coins_100"]);
    }

    #[tokio::test]
    async fn query_drops_entries_that_were_not_requested() {
        let mut store = ScriptedStore::with_catalog(&["pro_yearly", "coins_100", "pro_monthly"]);
        store.whole_catalog = true;
        let translator = translator(store);

        let products = translator
            .query_products(vec!["pro_monthly".to_string(), "pro_yearly".to_string()])
            .await
            .unwrap();

        let ids: Vec<&str> = products.iter().map(|p| p.identifier.as_str()).collect();
        assert_eq!(ids, ["pro_monthly", "pro_yearly"]);
    }

    #[tokio::test]
    async fn query_failure_is_a_platform_error() {
        let mut store = ScriptedStore::with_catalog(&["pro_monthly"]);
        store.products_error = Some("Cannot connect to iTunes Store".to_string());
        let translator = translator(store);

        let err = translator
            .query_products(vec!["pro_monthly".to_string()])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PlatformError);
    }

    #[tokio::test]
    async fn restore_finishes_queue_and_tolerates_already_finished() {
        let store = ScriptedStore {
            unfinished: vec!["1".to_string(), "2".to_string()],
            finished: Mutex::new(vec!["2".to_string()]),
            ..Default::default()
        };
        let translator = translator(store);

        translator.restore().await.unwrap();

        assert_eq!(ScriptedStore::calls(&translator.store.finish_calls), 2);
        assert_eq!(
            *translator.store.finished.lock().unwrap(),
            vec!["2".to_string(), "1".to_string()]
        );

        // Running it again over the same queue is a no-op.
        translator.restore().await.unwrap();
    }

    #[tokio::test]
    async fn restore_sync_failure_finishes_nothing() {
        let store = ScriptedStore {
            sync_error: Some("You are not signed in to the App Store.".to_string()),
            unfinished: vec!["1".to_string()],
            ..Default::default()
        };
        let translator = translator(store);

        let err = translator.restore().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PlatformError);
        assert_eq!(err.to_string(), "You are not signed in to the App Store.");
        assert_eq!(ScriptedStore::calls(&translator.store.finish_calls), 0);
    }

    #[tokio::test]
    async fn restore_queue_listing_failure_is_a_platform_error() {
        let store = ScriptedStore {
            unfinished_error: Some("SKErrorDomain error 0".to_string()),
            unfinished: vec!["1".to_string()],
            ..Default::default()
        };
        let translator = translator(store);

        let err = translator.restore().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PlatformError);
        assert_eq!(err.to_string(), "SKErrorDomain error 0");
        assert_eq!(ScriptedStore::calls(&translator.store.finish_calls), 0);
    }

    #[tokio::test]
    async fn restore_attempts_every_transaction_before_failing() {
        let store = ScriptedStore {
            unfinished: vec!["1".to_string(), "2".to_string(), "3".to_string()],
            unfinishable: vec!["2".to_string()],
            ..Default::default()
        };
        let translator = translator(store);

        let err = translator.restore().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PlatformError);
        assert!(err.to_string().contains("transactions 2:"));
        assert_eq!(ScriptedStore::calls(&translator.store.finish_calls), 3);
        assert_eq!(
            *translator.store.finished.lock().unwrap(),
            vec!["1".to_string(), "3".to_string()]
        );
    }

    #[tokio::test]
    async fn billing_support_never_fails() {
        let supported = translator(ScriptedStore {
            supported: Some(true),
            ..Default::default()
        });
        assert!(supported.is_billing_supported().await);

        let broken = translator(ScriptedStore::default());
        assert!(!broken.is_billing_supported().await);
    }

    #[test]
    fn version_comes_from_the_package() {
        let translator = translator(ScriptedStore::default());
        assert_eq!(translator.plugin_version(), env!("CARGO_PKG_VERSION"));
    }
}
