//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` (single attempt, buffered or streamed bodies)
//! - `NetworkMonitor` using a short TCP reachability probe
//! - `SettingsStore` using a SQLite-backed key-value table
//!
//! There is no desktop `MediaOutput`: audio output is always supplied by the
//! host application.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopNetworkMonitor, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let monitor = DesktopNetworkMonitor::new();
//!     // Hand both to CoreConfig::builder()
//!     Ok(())
//! }
//! ```

mod http;
mod network;
mod settings;

pub use http::ReqwestHttpClient;
pub use network::DesktopNetworkMonitor;
pub use settings::SqliteSettingsStore;

use std::path::PathBuf;

/// Directory name used under the platform data directory.
pub const APP_DIR_NAME: &str = "ytmusic-client";

/// Default location for application databases on this machine.
///
/// Falls back to the current directory when the platform exposes no data
/// directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_dir_is_app_scoped() {
        let dir = default_data_dir();
        assert!(dir.ends_with(APP_DIR_NAME));
    }
}
