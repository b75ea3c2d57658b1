//! Network Monitoring Abstraction
//!
//! Tells the core whether the host is online. Playback consults this before
//! choosing between a cached stream URL, a local blob, or a fresh resolution.

use async_trait::async_trait;

use crate::error::Result;

/// Network connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Cellular,
    WiFi,
    Ethernet,
    Other,
}

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Connected,
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network information
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    pub network_type: Option<NetworkType>,
    /// Whether the connection is metered (has data limits/costs)
    pub is_metered: bool,
}

impl NetworkInfo {
    pub fn connected() -> Self {
        Self {
            status: NetworkStatus::Connected,
            network_type: None,
            is_metered: false,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            status: NetworkStatus::Disconnected,
            network_type: None,
            is_metered: false,
        }
    }
}

/// Network monitor trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// async fn can_stream(monitor: &dyn NetworkMonitor) -> bool {
///     monitor.is_connected().await
/// }
/// ```
#[async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Get current network information
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// Check if currently connected to any network
    ///
    /// An indeterminate status counts as connected; only a definite
    /// disconnect makes the core take the offline path.
    async fn is_connected(&self) -> bool {
        !matches!(
            self.get_network_info().await,
            Ok(NetworkInfo {
                status: NetworkStatus::Disconnected,
                ..
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedMonitor(NetworkStatus);

    #[async_trait]
    impl NetworkMonitor for FixedMonitor {
        async fn get_network_info(&self) -> Result<NetworkInfo> {
            Ok(NetworkInfo {
                status: self.0,
                network_type: Some(NetworkType::WiFi),
                is_metered: false,
            })
        }
    }

    #[tokio::test]
    async fn test_is_connected_defaults() {
        assert!(FixedMonitor(NetworkStatus::Connected).is_connected().await);
        assert!(FixedMonitor(NetworkStatus::Indeterminate).is_connected().await);
        assert!(!FixedMonitor(NetworkStatus::Disconnected).is_connected().await);
    }

    #[test]
    fn test_network_info_constructors() {
        assert_eq!(NetworkInfo::connected().status, NetworkStatus::Connected);
        assert_eq!(NetworkInfo::disconnected().status, NetworkStatus::Disconnected);
    }
}
