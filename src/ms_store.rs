use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::de::DeserializeOwned;
use tauri::{plugin::PluginApi, AppHandle, Manager, Runtime};
use windows::core::HSTRING;
use windows::Foundation::DateTime as WinDateTime;
use windows::Services::Store::{
    StoreContext, StoreDurationUnit, StoreLicense, StoreProduct, StorePurchaseStatus,
};
use windows_collections::IIterable;

use crate::models::*;
use crate::store::PlatformStore;
use crate::store_rules::{ensure_single_unit, parse_localized_price};
use crate::Error;

/// Add-on kinds the Microsoft Store can sell from inside an app.
const ADD_ON_KINDS: [&str; 3] = ["Consumable", "UnmanagedConsumable", "Durable"];

pub fn init<R: Runtime, C: DeserializeOwned>(
    app: &AppHandle<R>,
    _api: PluginApi<R, C>,
) -> crate::Result<Store<R>> {
    Ok(Store {
        app_handle: app.clone(),
        store_context: RwLock::new(None),
    })
}

/// Store backed by `Windows.Services.Store`.
pub struct Store<R: Runtime> {
    app_handle: AppHandle<R>,
    store_context: RwLock<Option<StoreContext>>,
}

/// Runs blocking WinRT `.get()` calls off the async runtime.
async fn blocking<T, F>(work: F) -> crate::Result<T>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tauri::async_runtime::spawn_blocking(work).await?
}

/// Windows `DateTime` counts 100ns ticks since 1601-01-01. Unset dates are
/// zero and licenses without an end carry 9999-12-31.
fn to_utc(datetime: &WinDateTime) -> Option<DateTime<Utc>> {
    const TICKS_PER_MILLI: i64 = 10_000;
    const MILLIS_TO_UNIX_EPOCH: i64 = 11_644_473_600_000;

    if datetime.UniversalTime <= 0 {
        return None;
    }
    let millis = datetime.UniversalTime / TICKS_PER_MILLI - MILLIS_TO_UNIX_EPOCH;
    DateTime::from_timestamp_millis(millis).filter(|date| date.year() < 9999)
}

fn to_period(value: u32, unit: StoreDurationUnit) -> Option<SubscriptionPeriod> {
    let unit = match unit {
        StoreDurationUnit::Day => PeriodUnit::Day,
        StoreDurationUnit::Week => PeriodUnit::Week,
        StoreDurationUnit::Month => PeriodUnit::Month,
        StoreDurationUnit::Year => PeriodUnit::Year,
        _ => return None,
    };
    Some(SubscriptionPeriod { unit, value })
}

fn convert_store_product(store_product: &StoreProduct) -> crate::Result<Product> {
    let price = store_product.Price()?;
    let price_string = price.FormattedPrice()?.to_string();

    let price_value = parse_localized_price(&price_string)?;

    let mut subscription_period = None;
    let mut introductory_offer = None;
    let skus = store_product.Skus()?;
    for i in 0..skus.Size()? {
        let sku = skus.GetAt(i)?;
        if !sku.IsSubscription()? {
            continue;
        }
        let info = sku.SubscriptionInfo()?;
        subscription_period = to_period(info.BillingPeriod()?, info.BillingPeriodUnit()?);
        if info.HasTrialPeriod()? {
            introductory_offer = to_period(info.TrialPeriod()?, info.TrialPeriodUnit()?).map(
                |period| ProductOffer {
                    price: 0.0,
                    price_string: String::new(),
                    period,
                    period_count: 1,
                    payment_mode: PaymentMode::FreeTrial,
                },
            );
        }
        break;
    }

    let kind = store_product.ProductKind()?.to_string();
    let product_type = match kind.as_str() {
        "Consumable" | "UnmanagedConsumable" => ProductType::Consumable,
        "Durable" if subscription_period.is_some() => ProductType::AutoRenewable,
        "Durable" => ProductType::NonConsumable,
        _ => ProductType::Unknown(kind),
    };

    Ok(Product {
        identifier: store_product.StoreId()?.to_string(),
        title: store_product.Title()?.to_string(),
        description: store_product.Description()?.to_string(),
        price: price_value,
        price_string,
        currency_code: Some(price.CurrencyCode()?.to_string()),
        product_type,
        is_family_shareable: None,
        subscription_group_id: None,
        subscription_period,
        introductory_offer,
    })
}

fn apply_license(transaction: &mut StoreTransaction, license: &StoreLicense) -> crate::Result<()> {
    transaction.transaction_id = license.SkuStoreId()?.to_string();
    transaction.expiration_date = to_utc(&license.ExpirationDate()?);
    Ok(())
}

impl<R: Runtime> Store<R> {
    /// Get or create the StoreContext instance
    fn store_context(&self) -> crate::Result<StoreContext> {
        let mut context_guard = self
            .store_context
            .write()
            .map_err(|_| Error::platform("store context lock poisoned"))?;

        if let Some(context) = context_guard.as_ref() {
            return Ok(context.clone());
        }
        let context = StoreContext::GetDefault()?;
        *context_guard = Some(context.clone());
        Ok(context)
    }

    /// The Microsoft Store does not expose a transaction object, so one is
    /// assembled from the add-on license when there is one.
    ///
    /// A license id is the SKU's store id: it is the same for every purchase
    /// of that SKU. Without a license (consumables) the id is generated from
    /// the product id and the purchase time.
    async fn purchased_transaction(
        &self,
        context: StoreContext,
        product: &Product,
    ) -> crate::Result<StoreTransaction> {
        let now = Utc::now();
        let mut transaction = StoreTransaction::new(
            format!("win_{}_{}", product.identifier, now.timestamp_millis()),
            product.identifier.clone(),
            now,
        );
        transaction.product_type = Some(product.product_type.clone());
        transaction.purchased_quantity = Some(1);
        transaction.app_bundle_id = Some(self.app_handle.package_info().name.clone());

        let store_id = product.identifier.clone();
        blocking(move || {
            let app_license = context.GetAppLicenseAsync()?.get()?;
            let add_ons = app_license.AddOnLicenses()?;
            let key = HSTRING::from(&store_id);
            if add_ons.HasKey(&key)? {
                apply_license(&mut transaction, &add_ons.Lookup(&key)?)?;
            }
            Ok(transaction)
        })
        .await
    }
}

#[async_trait]
impl<R: Runtime> PlatformStore for Store<R> {
    async fn is_billing_supported(&self) -> crate::Result<bool> {
        Ok(self.store_context().is_ok())
    }

    async fn products(&self, product_ids: &[String]) -> crate::Result<Vec<Product>> {
        let context = self.store_context()?;
        let product_ids = product_ids.to_vec();

        blocking(move || {
            let kinds: Vec<HSTRING> = ADD_ON_KINDS.iter().map(|kind| HSTRING::from(*kind)).collect();
            let store_ids: Vec<HSTRING> = product_ids
                .iter()
                .map(|id| HSTRING::from(id.as_str()))
                .collect();

            let kinds_it: IIterable<HSTRING> = IIterable::try_from(kinds)
                .map_err(|e| Error::platform(format!("Failed to create IIterable: {e:?}")))?;
            let ids_it: IIterable<HSTRING> = IIterable::try_from(store_ids)
                .map_err(|e| Error::platform(format!("Failed to create IIterable: {e:?}")))?;

            let query_result = context.GetStoreProductsAsync(&kinds_it, &ids_it)?.get()?;
            let extended_error = query_result.ExtendedError()?;
            if extended_error.is_err() {
                return Err(Error::platform(extended_error.message()));
            }

            let mut products = Vec::new();
            let iterator = query_result.Products()?.First()?;
            while iterator.HasCurrent()? {
                let store_product = iterator.Current()?.Value()?;
                products.push(convert_store_product(&store_product)?);
                iterator.MoveNext()?;
            }
            Ok(products)
        })
        .await
    }

    async fn purchase(&self, product: &Product, quantity: u32) -> crate::Result<PurchaseOutcome> {
        ensure_single_unit(quantity)?;
        let context = self.store_context()?;
        let store_id = HSTRING::from(&product.identifier);
        let request_context = context.clone();

        let status = blocking(move || {
            let result = request_context.RequestPurchaseAsync(&store_id)?.get()?;
            Ok(result.Status()?)
        })
        .await?;

        // Licenses are signed and checked by the Store itself.
        match status {
            StorePurchaseStatus::Succeeded => {
                let transaction = self.purchased_transaction(context, product).await?;
                Ok(PurchaseOutcome::Verified { transaction })
            }
            // No new transaction took place, the caller should restore instead.
            StorePurchaseStatus::AlreadyPurchased => Err(Error::platform(format!(
                "{} is already owned",
                product.identifier
            ))),
            StorePurchaseStatus::NotPurchased => Ok(PurchaseOutcome::UserCancelled),
            StorePurchaseStatus::NetworkError => Err(Error::platform("Network error during purchase")),
            StorePurchaseStatus::ServerError => Err(Error::platform("Server error during purchase")),
            _ => Ok(PurchaseOutcome::Unrecognized),
        }
    }

    async fn finish_transaction(&self, transaction_id: &str) -> crate::Result<FinishStatus> {
        // Nothing to acknowledge, the Store settles add-on licenses on its own.
        log::debug!("Microsoft Store transaction {transaction_id} needs no finishing");
        Ok(FinishStatus::Finished)
    }

    async fn sync_purchases(&self) -> crate::Result<()> {
        let context = self.store_context()?;
        blocking(move || {
            context.GetAppLicenseAsync()?.get()?;
            Ok(())
        })
        .await
    }

    async fn unfinished_transactions(&self) -> crate::Result<Vec<String>> {
        Ok(Vec::new())
    }
}
