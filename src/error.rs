use serde::{ser::Serializer, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

/// Message used when the caller sends an empty product identifier.
pub(crate) const EMPTY_PRODUCT_IDENTIFIER: &str = "productIdentifier is Empty, give an id";

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("{0}")]
  InvalidArgument(String),
  #[error("Product not found: {0}")]
  ProductNotFound(String),
  /// The store reported a purchase it could not verify.
  #[error("{0}")]
  VerificationFailed(String),
  #[error("Transaction pending")]
  Pending,
  #[error("User cancelled")]
  Cancelled,
  #[error("Unknown error")]
  Unknown,
  /// Anything raised by the platform store, message passed through as is.
  #[error("{0}")]
  PlatformError(String),
}

/// Stable classification of an [`Error`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
  InvalidArgument,
  ProductNotFound,
  VerificationFailed,
  Pending,
  Cancelled,
  Unknown,
  PlatformError,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
      Error::ProductNotFound(_) => ErrorKind::ProductNotFound,
      Error::VerificationFailed(_) => ErrorKind::VerificationFailed,
      Error::Pending => ErrorKind::Pending,
      Error::Cancelled => ErrorKind::Cancelled,
      Error::Unknown => ErrorKind::Unknown,
      Error::PlatformError(_) => ErrorKind::PlatformError,
    }
  }

  pub(crate) fn platform(message: impl std::fmt::Display) -> Self {
    Error::PlatformError(message.to_string())
  }
}

#[cfg(any(target_os = "android", target_os = "ios"))]
impl From<tauri::plugin::mobile::PluginInvokeError> for Error {
  fn from(error: tauri::plugin::mobile::PluginInvokeError) -> Self {
    Error::platform(error)
  }
}

#[cfg(target_os = "windows")]
impl From<windows_result::Error> for Error {
  fn from(error: windows_result::Error) -> Self {
    Error::platform(error.message())
  }
}

impl From<tauri::Error> for Error {
  fn from(error: tauri::Error) -> Self {
    Error::platform(error)
  }
}

impl Serialize for Error {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(self.to_string().as_ref())
  }
}
