//! Link state and link name changes via rtnetlink.
//!
//! Talks to the kernel directly instead of calling the `ip` command. All
//! operations are async and need a running tokio runtime, since the netlink
//! connection is spawned as a background task.

use crate::error::{NetlinkError, Result};
use futures::stream::TryStreamExt;
use rtnetlink::{new_connection, Handle};
use std::net::{IpAddr, Ipv4Addr};

/// Longest name the kernel accepts (IFNAMSIZ minus the trailing NUL).
pub const MAX_INTERFACE_NAME_LEN: usize = libc::IFNAMSIZ - 1;

/// Manager for administrative state and renames of network interfaces.
///
/// Each manager owns its own netlink connection, spawned on the current
/// tokio runtime.
pub struct InterfaceManager {
    handle: Handle,
}

impl InterfaceManager {
    /// Create a new interface manager.
    ///
    /// # Errors
    ///
    /// Returns error if the netlink connection cannot be established.
    pub fn new() -> Result<Self> {
        let (connection, handle, _) = new_connection().map_err(|e| {
            NetlinkError::runtime("creating netlink connection for interface management", e.to_string())
        })?;

        tokio::spawn(connection);

        Ok(Self { handle })
    }

    /// Get the kernel index for a network interface by name.
    ///
    /// # Errors
    ///
    /// * `InterfaceNotFound` - Interface does not exist
    /// * `InterfaceIndexError` - Failed to query interface
    pub async fn get_interface_index(&self, name: &str) -> Result<u32> {
        if name.is_empty() {
            return Err(NetlinkError::empty_name());
        }
        let mut links = self.handle.link().get().match_name(name.to_string()).execute();

        match links.try_next().await {
            Ok(Some(link)) => Ok(link.header.index),
            Ok(None) => Err(NetlinkError::InterfaceNotFound {
                name: name.to_string(),
            }),
            // The kernel answers a lookup for a missing name with ENODEV.
            Err(e) if e.to_string().contains("No such device") => {
                Err(NetlinkError::InterfaceNotFound {
                    name: name.to_string(),
                })
            }
            Err(e) => Err(NetlinkError::InterfaceIndexError {
                interface: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Bring a network interface up (set IFF_UP flag).
    ///
    /// # Errors
    ///
    /// * `InterfaceNotFound` - Interface does not exist
    /// * `SetStateError` - Failed to set interface state (insufficient permissions, etc.)
    pub async fn set_interface_up(&self, name: &str) -> Result<()> {
        let index = self.get_interface_index(name).await?;

        self.handle
            .link()
            .set(index)
            .up()
            .execute()
            .await
            .map_err(|e| NetlinkError::SetStateError {
                interface: name.to_string(),
                desired_state: "UP".to_string(),
                reason: e.to_string(),
            })?;

        log::info!("Interface {} set to UP", name);
        Ok(())
    }

    /// Bring a network interface down (clear IFF_UP flag).
    ///
    /// # Errors
    ///
    /// * `InterfaceNotFound` - Interface does not exist
    /// * `SetStateError` - Failed to set interface state
    pub async fn set_interface_down(&self, name: &str) -> Result<()> {
        let index = self.get_interface_index(name).await?;

        self.handle
            .link()
            .set(index)
            .down()
            .execute()
            .await
            .map_err(|e| NetlinkError::SetStateError {
                interface: name.to_string(),
                desired_state: "DOWN".to_string(),
                reason: e.to_string(),
            })?;

        log::info!("Interface {} set to DOWN", name);
        Ok(())
    }

    /// Rename a network interface.
    ///
    /// The kernel refuses to rename an interface that is administratively up
    /// (EBUSY), so callers bring it down first.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` - `new_name` is empty or longer than the kernel allows
    /// * `InterfaceNotFound` - Interface does not exist
    /// * `RenameError` - The kernel rejected the rename (name in use, interface up, ...)
    pub async fn rename_interface(&self, name: &str, new_name: &str) -> Result<()> {
        if new_name.is_empty() || new_name.len() > MAX_INTERFACE_NAME_LEN {
            return Err(NetlinkError::InvalidArgument {
                parameter: "new interface name".to_string(),
                value: new_name.to_string(),
                reason: format!("must be 1-{} bytes", MAX_INTERFACE_NAME_LEN),
            });
        }
        let index = self.get_interface_index(name).await?;

        self.handle
            .link()
            .set(index)
            .name(new_name.to_string())
            .execute()
            .await
            .map_err(|e| NetlinkError::RenameError {
                interface: name.to_string(),
                new_name: new_name.to_string(),
                reason: e.to_string(),
            })?;

        log::info!("Interface {} renamed to {}", name, new_name);
        Ok(())
    }

    /// IPv4 addresses assigned to an interface, in kernel order.
    ///
    /// # Errors
    ///
    /// * `InterfaceNotFound` - Interface does not exist
    /// * `Runtime` - Failed to enumerate addresses
    pub async fn get_ipv4_addresses(&self, name: &str) -> Result<Vec<Ipv4Addr>> {
        let index = self.get_interface_index(name).await?;
        let mut addrs = self
            .handle
            .address()
            .get()
            .set_link_index_filter(index)
            .execute();

        let mut found = Vec::new();
        while let Some(addr) = addrs.try_next().await.map_err(|e| {
            NetlinkError::runtime(format!("listing addresses of {}", name), e.to_string())
        })? {
            for nla in addr.attributes {
                if let netlink_packet_route::address::AddressAttribute::Address(IpAddr::V4(ip)) = nla {
                    found.push(ip);
                }
            }
        }
        Ok(found)
    }
}
