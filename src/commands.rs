use tauri::{AppHandle, command, Runtime};

use crate::models::*;
use crate::{NativePurchasesExt, Result};

#[command]
pub(crate) async fn get_plugin_version<R: Runtime>(
    app: AppHandle<R>,
) -> Result<PluginVersionResponse> {
    Ok(PluginVersionResponse {
        version: app.native_purchases().plugin_version().to_string(),
    })
}

#[command]
pub(crate) async fn is_billing_supported<R: Runtime>(
    app: AppHandle<R>,
) -> Result<BillingSupportResponse> {
    Ok(BillingSupportResponse {
        is_billing_supported: app.native_purchases().is_billing_supported().await,
    })
}

#[command]
pub(crate) async fn purchase_product<R: Runtime>(
    app: AppHandle<R>,
    payload: PurchaseRequest,
) -> Result<PurchaseResponse> {
    let transaction = app.native_purchases().purchase(payload).await?;
    Ok(PurchaseResponse { transaction })
}

#[command]
pub(crate) async fn restore_purchases<R: Runtime>(
    app: AppHandle<R>,
) -> Result<RestorePurchasesResponse> {
    app.native_purchases().restore().await?;
    Ok(RestorePurchasesResponse {})
}

#[command]
pub(crate) async fn get_products<R: Runtime>(
    app: AppHandle<R>,
    payload: GetProductsRequest,
) -> Result<GetProductsResponse> {
    let products = app
        .native_purchases()
        .query_products(payload.product_identifiers)
        .await?;
    Ok(GetProductsResponse { products })
}
