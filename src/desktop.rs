use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tauri::{plugin::PluginApi, AppHandle, Runtime};

use crate::models::*;
use crate::store::PlatformStore;

const UNSUPPORTED: &str = "In-app purchases are not supported on this platform";

pub fn init<R: Runtime, C: DeserializeOwned>(
    app: &AppHandle<R>,
    _api: PluginApi<R, C>,
) -> crate::Result<Store<R>> {
    Ok(Store(app.clone()))
}

/// Store for platforms without a native purchase API.
pub struct Store<R: Runtime>(AppHandle<R>);

impl<R: Runtime> Store<R> {
    fn unsupported<T>(&self, operation: &str) -> crate::Result<T> {
        log::debug!(
            "{}: {operation} requested, but no store is available",
            self.0.package_info().name
        );
        Err(crate::Error::platform(UNSUPPORTED))
    }
}

#[async_trait]
impl<R: Runtime> PlatformStore for Store<R> {
    async fn is_billing_supported(&self) -> crate::Result<bool> {
        Ok(false)
    }

    async fn products(&self, _product_ids: &[String]) -> crate::Result<Vec<Product>> {
        self.unsupported("product lookup")
    }

    async fn purchase(&self, _product: &Product, _quantity: u32) -> crate::Result<PurchaseOutcome> {
        self.unsupported("purchase")
    }

    async fn finish_transaction(&self, _transaction_id: &str) -> crate::Result<FinishStatus> {
        self.unsupported("finish transaction")
    }

    async fn sync_purchases(&self) -> crate::Result<()> {
        self.unsupported("purchase sync")
    }

    async fn unfinished_transactions(&self) -> crate::Result<Vec<String>> {
        self.unsupported("unfinished transactions")
    }
}
