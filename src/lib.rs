use tauri::{
  plugin::{Builder, TauriPlugin},
  Manager, Runtime,
};

pub use config::Config;
pub use models::*;
pub use store::PlatformStore;
pub use translator::{PurchaseTranslator, PLUGIN_VERSION};

#[cfg(not(any(target_os = "android", target_os = "ios", target_os = "windows")))]
mod desktop;
#[cfg(any(target_os = "android", target_os = "ios"))]
mod mobile;
#[cfg(target_os = "windows")]
mod ms_store;

mod commands;
mod config;
mod error;
mod models;
mod store;
mod store_rules;
mod translator;

pub use error::{Error, ErrorKind, Result};

#[cfg(not(any(target_os = "android", target_os = "ios", target_os = "windows")))]
use desktop::Store;
#[cfg(any(target_os = "android", target_os = "ios"))]
use mobile::Store;
#[cfg(target_os = "windows")]
use ms_store::Store;

/// The purchase translator bound to the store of the current platform.
pub type NativePurchases<R> = PurchaseTranslator<Store<R>>;

/// Extensions to [`tauri::App`], [`tauri::AppHandle`] and [`tauri::Window`] to access the native purchases APIs.
pub trait NativePurchasesExt<R: Runtime> {
  fn native_purchases(&self) -> &NativePurchases<R>;
}

impl<R: Runtime, T: Manager<R>> crate::NativePurchasesExt<R> for T {
  fn native_purchases(&self) -> &NativePurchases<R> {
    self.state::<NativePurchases<R>>().inner()
  }
}

/// Initializes the plugin.
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<Config>> {
  Builder::<R, Option<Config>>::new("native-purchases")
    .invoke_handler(tauri::generate_handler![
      commands::get_plugin_version,
      commands::is_billing_supported,
      commands::purchase_product,
      commands::restore_purchases,
      commands::get_products,
    ])
    .setup(|app, api| {
      let config = api.config().clone().unwrap_or_default();
      log::debug!("native purchases {PLUGIN_VERSION}: max quantity {}", config.max_quantity);
      #[cfg(not(any(target_os = "android", target_os = "ios", target_os = "windows")))]
      let store = desktop::init(app, api)?;
      #[cfg(any(target_os = "android", target_os = "ios"))]
      let store = mobile::init(app, api)?;
      #[cfg(target_os = "windows")]
      let store = ms_store::init(app, api)?;
      app.manage(PurchaseTranslator::new(store, config));
      Ok(())
    })
    .build()
}
