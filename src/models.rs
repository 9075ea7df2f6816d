use chrono::{
    serde::{ts_milliseconds, ts_milliseconds_option},
    DateTime, Utc,
};
use serde::{Deserialize, Serialize};

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[serde(default)]
    pub product_identifier: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl PurchaseRequest {
    pub fn new(product_identifier: impl Into<String>) -> Self {
        Self {
            product_identifier: product_identifier.into(),
            quantity: default_quantity(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetProductsRequest {
    #[serde(default)]
    pub product_identifiers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginVersionResponse {
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSupportResponse {
    pub is_billing_supported: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub transaction: TransactionRecord,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RestorePurchasesResponse {}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetProductsResponse {
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductType {
    Consumable,
    NonConsumable,
    NonRenewable,
    AutoRenewable,

    #[serde(untagged)]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPeriod {
    pub unit: PeriodUnit,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMode {
    FreeTrial,
    PayAsYouGo,
    PayUpFront,

    #[serde(untagged)]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOffer {
    pub price: f64,
    pub price_string: String,
    pub period: SubscriptionPeriod,
    pub period_count: u32,
    pub payment_mode: PaymentMode,
}

/// A catalog entry as reported by the platform store.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub price_string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    pub product_type: ProductType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_family_shareable: Option<bool>,
    #[serde(rename = "subscriptionGroupID", skip_serializing_if = "Option::is_none")]
    pub subscription_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_period: Option<SubscriptionPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introductory_offer: Option<ProductOffer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreEnvironment {
    Production,
    Sandbox,
    Xcode,

    #[serde(untagged)]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OwnershipType {
    /// The transaction belongs to the purchaser.
    Purchased,
    /// Available to the user through Family Sharing.
    FamilyShared,

    #[serde(untagged)]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PurchaseReason {
    Purchase,
    Renewal,

    #[serde(untagged)]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RevocationReason {
    DeveloperIssue,
    Other,

    #[serde(untagged)]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionStatus {
    Subscribed,
    Expired,
    InBillingRetryPeriod,
    InGracePeriod,
    Revoked,

    #[serde(untagged)]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OfferType {
    Introductory,
    Promotional,
    Code,
    WinBack,

    #[serde(untagged)]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOffer {
    #[serde(rename = "type")]
    pub offer_type: OfferType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_mode: Option<PaymentMode>,
}

/// Transaction attributes exactly as the native layer reports them.
///
/// Dates arrive as Unix milliseconds. Identifiers arrive as strings since
/// store ids do not fit in a JavaScript number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreTransaction {
    pub transaction_id: String,
    pub product_id: String,
    #[serde(with = "ts_milliseconds")]
    pub purchase_date: DateTime<Utc>,
    pub original_transaction_id: Option<String>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub original_purchase_date: Option<DateTime<Utc>>,
    pub web_order_line_item_id: Option<String>,
    pub app_bundle_id: Option<String>,
    pub product_type: Option<ProductType>,
    pub subscription_group_id: Option<String>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub expiration_date: Option<DateTime<Utc>>,
    pub is_upgraded: Option<bool>,
    pub ownership_type: Option<OwnershipType>,
    pub purchased_quantity: Option<u32>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub reason: Option<PurchaseReason>,
    pub offer: Option<TransactionOffer>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub revocation_date: Option<DateTime<Utc>>,
    pub revocation_reason: Option<RevocationReason>,
    pub app_account_token: Option<String>,
    pub environment: Option<StoreEnvironment>,
    pub storefront: Option<String>,
}

impl StoreTransaction {
    /// A transaction carrying only the attributes every store reports.
    pub fn new(
        transaction_id: impl Into<String>,
        product_id: impl Into<String>,
        purchase_date: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            product_id: product_id.into(),
            purchase_date,
            original_transaction_id: None,
            original_purchase_date: None,
            web_order_line_item_id: None,
            app_bundle_id: None,
            product_type: None,
            subscription_group_id: None,
            expiration_date: None,
            is_upgraded: None,
            ownership_type: None,
            purchased_quantity: None,
            subscription_status: None,
            reason: None,
            offer: None,
            revocation_date: None,
            revocation_reason: None,
            app_account_token: None,
            environment: None,
            storefront: None,
        }
    }
}

/// Result of a platform purchase flow.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum PurchaseOutcome {
    Verified {
        transaction: StoreTransaction,
    },
    /// The store completed the purchase but could not verify its signature.
    #[serde(rename_all = "camelCase")]
    Unverified {
        transaction: StoreTransaction,
        verification_error: String,
    },
    /// Waiting on Ask to Buy approval or Strong Customer Authentication.
    Pending,
    UserCancelled,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FinishStatus {
    Finished,
    AlreadyFinished,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishTransactionRequest {
    pub transaction_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishTransactionResponse {
    pub status: FinishStatus,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfinishedTransactionsResponse {
    pub transaction_ids: Vec<String>,
}

/// Normalized record of a completed purchase handed to the application.
///
/// Every timestamp is written as an RFC 3339 UTC string with millisecond
/// precision. Attributes the store did not report are left out of the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<StoreEnvironment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storefront: Option<String>,
    #[serde(rename = "originalTransactionID", skip_serializing_if = "Option::is_none")]
    pub original_transaction_id: Option<String>,
    #[serde(
        serialize_with = "iso8601::serialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_purchase_date: Option<DateTime<Utc>>,
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    #[serde(rename = "webOrderLineItemID", skip_serializing_if = "Option::is_none")]
    pub web_order_line_item_id: Option<String>,
    #[serde(rename = "appBundleID", skip_serializing_if = "Option::is_none")]
    pub app_bundle_id: Option<String>,
    #[serde(rename = "productID")]
    pub product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,
    #[serde(rename = "subscriptionGroupID", skip_serializing_if = "Option::is_none")]
    pub subscription_group_id: Option<String>,
    #[serde(serialize_with = "iso8601::serialize")]
    pub purchase_date: DateTime<Utc>,
    #[serde(
        serialize_with = "iso8601::serialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_upgraded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership_type: Option<OwnershipType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchased_quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<PurchaseReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<TransactionOffer>,
    #[serde(
        serialize_with = "iso8601::serialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub revocation_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<RevocationReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_account_token: Option<String>,
}

impl From<StoreTransaction> for TransactionRecord {
    fn from(transaction: StoreTransaction) -> Self {
        Self {
            environment: transaction.environment,
            storefront: transaction.storefront,
            original_transaction_id: transaction.original_transaction_id,
            original_purchase_date: transaction.original_purchase_date,
            transaction_id: transaction.transaction_id,
            web_order_line_item_id: transaction.web_order_line_item_id,
            app_bundle_id: transaction.app_bundle_id,
            product_id: transaction.product_id,
            product_type: transaction.product_type,
            subscription_group_id: transaction.subscription_group_id,
            purchase_date: transaction.purchase_date,
            expiration_date: transaction.expiration_date,
            is_upgraded: transaction.is_upgraded,
            ownership_type: transaction.ownership_type,
            purchased_quantity: transaction.purchased_quantity,
            subscription_status: transaction.subscription_status,
            reason: transaction.reason,
            offer: transaction.offer,
            revocation_date: transaction.revocation_date,
            revocation_reason: transaction.revocation_reason,
            app_account_token: transaction.app_account_token,
        }
    }
}

pub(crate) mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::Serializer;

    pub(crate) fn format(timestamp: &DateTime<Utc>) -> String {
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub(crate) fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(timestamp))
    }

    pub(crate) fn serialize_option<S>(
        timestamp: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match timestamp {
            Some(timestamp) => serialize(timestamp, serializer),
            None => serializer.serialize_none(),
        }
    }
}
