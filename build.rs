const COMMANDS: &[&str] = &[
  "get_plugin_version",
  "is_billing_supported",
  "purchase_product",
  "restore_purchases",
  "get_products",
];

fn main() {
  tauri_plugin::Builder::new(COMMANDS)
    .android_path("android")
    .ios_path("ios")
    .build();
}
