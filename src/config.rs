use serde::Deserialize;

/// Largest quantity the App Store accepts in a single purchase.
const DEFAULT_MAX_QUANTITY: u32 = 10;

fn default_max_quantity() -> u32 {
    DEFAULT_MAX_QUANTITY
}

/// Plugin configuration, read from `plugins.native-purchases` in
/// `tauri.conf.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Upper bound for `quantity` in a purchase request.
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_quantity: DEFAULT_MAX_QUANTITY,
        }
    }
}
