//! # sozin-netlink
//!
//! Native replacements for the `ip link set`, `iw dev ... set type` and
//! `systemctl restart` calls sozin needs, using rtnetlink, nl80211 and the
//! systemd D-Bus API.
//!
//! ## Platform Support
//!
//! Linux-only. Modules are gated with `#[cfg(target_os = "linux")]`; the crate
//! compiles elsewhere but the operations are unavailable.
//!
//! ## Usage
//!
//! ```no_run
//! use sozin_netlink::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     set_interface_down("wlan0").await?;
//!     set_wireless_mode("wlan0", InterfaceMode::Monitor)?;
//!     set_interface_up("wlan0").await?;
//!     Ok(())
//! }
//! ```

pub mod error;
#[cfg(target_os = "linux")]
pub mod interface;
pub mod systemd;
#[cfg(target_os = "linux")]
pub mod wireless;

pub use error::{NetlinkError, Result};
#[cfg(target_os = "linux")]
pub use interface::{InterfaceManager, MAX_INTERFACE_NAME_LEN};
pub use systemd::restart_unit;
#[cfg(target_os = "linux")]
pub use wireless::{InterfaceMode, WirelessManager};

/// Bring an interface up. Must be called from within a tokio runtime.
#[cfg(target_os = "linux")]
pub async fn set_interface_up(interface: &str) -> Result<()> {
    InterfaceManager::new()?.set_interface_up(interface).await
}

/// Bring an interface down. Must be called from within a tokio runtime.
#[cfg(target_os = "linux")]
pub async fn set_interface_down(interface: &str) -> Result<()> {
    InterfaceManager::new()?.set_interface_down(interface).await
}

/// Rename an interface. It must already be down.
#[cfg(target_os = "linux")]
pub async fn rename_interface(interface: &str, new_name: &str) -> Result<()> {
    InterfaceManager::new()?
        .rename_interface(interface, new_name)
        .await
}

/// IPv4 addresses of an interface. Must be called from within a tokio runtime.
#[cfg(target_os = "linux")]
pub async fn get_ipv4_addresses(interface: &str) -> Result<Vec<std::net::Ipv4Addr>> {
    InterfaceManager::new()?.get_ipv4_addresses(interface).await
}

/// Switch a wireless interface between managed and monitor mode. Blocking.
#[cfg(target_os = "linux")]
pub fn set_wireless_mode(interface: &str, mode: InterfaceMode) -> Result<()> {
    WirelessManager::new()?.set_mode(interface, mode)
}

/// [`set_wireless_mode`] that gives up with [`NetlinkError::Timeout`] when
/// the kernel does not answer within `timeout`.
#[cfg(target_os = "linux")]
pub fn set_wireless_mode_with_timeout(
    interface: &str,
    mode: InterfaceMode,
    timeout: std::time::Duration,
) -> Result<()> {
    WirelessManager::with_timeout(timeout)?.set_mode(interface, mode)
}
