use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

/// Administrative state of an interface (the IFF_UP flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    Up,
    Down,
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminState::Up => write!(f, "UP"),
            AdminState::Down => write!(f, "DOWN"),
        }
    }
}

/// Wireless operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Managed,
    Monitor,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Managed => write!(f, "managed"),
            LinkType::Monitor => write!(f, "monitor"),
        }
    }
}

/// An interface as observed (or as the engine expects it to be).
///
/// The kernel owns creation and removal; sozin only changes `admin_state`,
/// `link_type` and `name` of a device that already exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub name: String,
    pub admin_state: AdminState,
    pub link_type: LinkType,
    /// Has an 802.11 PHY
    pub wireless: bool,
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wireless {
            write!(f, "{} is {} ({} mode)", self.name, self.admin_state, self.link_type)
        } else {
            write!(f, "{} is {}", self.name, self.admin_state)
        }
    }
}

/// What kind of device an interface sits on. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Wireless,
    Ethernet,
    Loopback,
    Virtual,
    #[default]
    Unknown,
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceKind::Wireless => write!(f, "Wireless"),
            InterfaceKind::Ethernet => write!(f, "Ethernet"),
            InterfaceKind::Loopback => write!(f, "Loopback"),
            InterfaceKind::Virtual => write!(f, "Virtual"),
            InterfaceKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Extra facts shown when listing. The engine never looks at these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceDetails {
    pub kind: InterfaceKind,
    pub mac_address: Option<String>,
    pub driver: Option<String>,
    pub ipv4_address: Option<Ipv4Addr>,
}

/// One row of an interface listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedInterface {
    #[serde(flatten)]
    pub interface: Interface,
    #[serde(flatten)]
    pub details: InterfaceDetails,
}

impl fmt::Display for ListedInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.interface, self.details.kind)?;
        if let Some(mac) = &self.details.mac_address {
            write!(f, " {}", mac)?;
        }
        if let Some(ip) = &self.details.ipv4_address {
            write!(f, " inet {}", ip)?;
        }
        if let Some(driver) = &self.details.driver {
            write!(f, " ({})", driver)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_row_shows_only_known_details() {
        let row = ListedInterface {
            interface: Interface {
                name: "wlan0".to_string(),
                admin_state: AdminState::Up,
                link_type: LinkType::Managed,
                wireless: true,
            },
            details: InterfaceDetails {
                kind: InterfaceKind::Wireless,
                mac_address: Some("00:11:22:33:44:55".to_string()),
                driver: Some("iwlwifi".to_string()),
                ipv4_address: Some(Ipv4Addr::new(192, 168, 1, 20)),
            },
        };
        assert_eq!(
            row.to_string(),
            "wlan0 is UP (managed mode) [Wireless] 00:11:22:33:44:55 inet 192.168.1.20 (iwlwifi)"
        );

        let bare = ListedInterface {
            details: InterfaceDetails::default(),
            ..row
        };
        assert_eq!(bare.to_string(), "wlan0 is UP (managed mode) [Unknown]");
    }

    #[test]
    fn listing_row_serializes_flat() {
        let row = ListedInterface {
            interface: Interface {
                name: "eth0".to_string(),
                admin_state: AdminState::Down,
                link_type: LinkType::Managed,
                wireless: false,
            },
            details: InterfaceDetails {
                kind: InterfaceKind::Ethernet,
                mac_address: Some("aa:bb:cc:dd:ee:ff".to_string()),
                driver: None,
                ipv4_address: None,
            },
        };

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["name"], "eth0");
        assert_eq!(value["admin_state"], "down");
        assert_eq!(value["kind"], "ethernet");
        assert_eq!(value["mac_address"], "aa:bb:cc:dd:ee:ff");
        assert!(value["ipv4_address"].is_null());
    }
}
