use std::sync::Arc;

use async_trait::async_trait;
use serde::{
    de::{DeserializeOwned, IgnoredAny},
    Serialize,
};
use tauri::{
    plugin::{PluginApi, PluginHandle},
    AppHandle, Runtime,
};

use crate::models::*;
use crate::store::PlatformStore;

#[cfg(target_os = "android")]
const PLUGIN_IDENTIFIER: &str = "app.tauri.nativepurchases";

#[cfg(target_os = "ios")]
tauri::ios_plugin_binding!(init_plugin_native_purchases);

// initializes the Kotlin or Swift plugin classes
pub fn init<R: Runtime, C: DeserializeOwned>(
    _app: &AppHandle<R>,
    api: PluginApi<R, C>,
) -> crate::Result<Store<R>> {
    #[cfg(target_os = "android")]
    let handle = api.register_android_plugin(PLUGIN_IDENTIFIER, "NativePurchasesPlugin")?;
    #[cfg(target_os = "ios")]
    let handle = api.register_ios_plugin(init_plugin_native_purchases)?;

    Ok(Store(Arc::new(handle)))
}

/// Store backed by the native plugin class.
pub struct Store<R: Runtime>(Arc<PluginHandle<R>>);

impl<R: Runtime> Store<R> {
    /// Runs a native command on a blocking worker; the bridge call waits for
    /// the native side to resolve.
    async fn invoke<P, T>(&self, command: &'static str, payload: P) -> crate::Result<T>
    where
        P: Serialize + Send + 'static,
        T: DeserializeOwned + Send + 'static,
    {
        let handle = Arc::clone(&self.0);
        tauri::async_runtime::spawn_blocking(move || handle.run_mobile_plugin(command, payload))
            .await?
            .map_err(Into::into)
    }
}

#[async_trait]
impl<R: Runtime> PlatformStore for Store<R> {
    async fn is_billing_supported(&self) -> crate::Result<bool> {
        let response: BillingSupportResponse = self.invoke("isBillingSupported", ()).await?;
        Ok(response.is_billing_supported)
    }

    async fn products(&self, product_ids: &[String]) -> crate::Result<Vec<Product>> {
        let response: GetProductsResponse = self
            .invoke(
                "getProducts",
                GetProductsRequest {
                    product_identifiers: product_ids.to_vec(),
                },
            )
            .await?;
        Ok(response.products)
    }

    async fn purchase(&self, product: &Product, quantity: u32) -> crate::Result<PurchaseOutcome> {
        self.invoke(
            "purchaseProduct",
            PurchaseRequest {
                product_identifier: product.identifier.clone(),
                quantity,
            },
        )
        .await
    }

    async fn finish_transaction(&self, transaction_id: &str) -> crate::Result<FinishStatus> {
        let response: FinishTransactionResponse = self
            .invoke(
                "finishTransaction",
                FinishTransactionRequest {
                    transaction_id: transaction_id.to_string(),
                },
            )
            .await?;
        Ok(response.status)
    }

    async fn sync_purchases(&self) -> crate::Result<()> {
        let _: IgnoredAny = self.invoke("syncPurchases", ()).await?;
        Ok(())
    }

    async fn unfinished_transactions(&self) -> crate::Result<Vec<String>> {
        let response: UnfinishedTransactionsResponse =
            self.invoke("getUnfinishedTransactions", ()).await?;
        Ok(response.transaction_ids)
    }
}
