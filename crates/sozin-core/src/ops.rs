use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::error::{EnumerationError, ExecutionError};
use crate::intent::PrimitiveStep;
use crate::model::{
    AdminState, Interface, InterfaceDetails, InterfaceKind, LinkType, ListedInterface,
};

pub const SYSFS_NET: &str = "/sys/class/net";

// ARPHRD_* values of the sysfs `type` attribute
const ARPHRD_ETHER: u32 = 1;
const ARPHRD_LOOPBACK: u32 = 772;
/// Link type of an interface in monitor mode.
const ARPHRD_IEEE80211_RADIOTAP: u32 = 803;

/// Read-only view of the OS device table.
pub trait DeviceLister: Send + Sync {
    /// Names of all interfaces currently known to the kernel, sorted.
    fn list(&self) -> Result<Vec<String>, EnumerationError>;

    /// Current state of one interface.
    fn snapshot(&self, interface: &str) -> Result<Interface, EnumerationError>;

    /// Listing extras for an interface already snapshotted. Best effort.
    fn details(&self, interface: &Interface) -> InterfaceDetails {
        InterfaceDetails {
            kind: if interface.wireless {
                InterfaceKind::Wireless
            } else {
                InterfaceKind::Unknown
            },
            ..InterfaceDetails::default()
        }
    }
}

/// Executes one privileged step. Synchronous, no retries.
pub trait CommandRunner: Send + Sync {
    fn run(&self, step: &PrimitiveStep) -> Result<(), ExecutionError>;
}

/// Keep only wireless interfaces from a listing.
pub fn wireless_only(lister: &dyn DeviceLister, names: &[String]) -> Vec<String> {
    names
        .iter()
        .filter(|name| {
            lister
                .snapshot(name)
                .map(|iface| iface.wireless)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Rows for `list` and the menu. Interfaces that vanish between listing and
/// snapshot are skipped.
pub fn listing(
    lister: &dyn DeviceLister,
    wireless: bool,
) -> Result<Vec<ListedInterface>, EnumerationError> {
    let names = lister.list()?;
    let names = if wireless {
        wireless_only(lister, &names)
    } else {
        names
    };

    Ok(names
        .iter()
        .filter_map(|name| lister.snapshot(name).ok())
        .map(|interface| ListedInterface {
            details: lister.details(&interface),
            interface,
        })
        .collect())
}

/// `DeviceLister` backed by `/sys/class/net`.
pub struct SysfsLister {
    base: PathBuf,
    /// Ask rtnetlink for IPv4 addresses when listing
    query_addresses: bool,
}

impl Default for SysfsLister {
    fn default() -> Self {
        Self::new(SYSFS_NET).with_addresses()
    }
}

impl SysfsLister {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            query_addresses: false,
        }
    }

    pub fn with_addresses(mut self) -> Self {
        self.query_addresses = true;
        self
    }

    fn kind(&self, dir: &Path, interface: &Interface) -> InterfaceKind {
        let arphrd = self
            .read_attr(dir, "type")
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok());
        if arphrd == Some(ARPHRD_LOOPBACK) {
            InterfaceKind::Loopback
        } else if interface.wireless {
            InterfaceKind::Wireless
        } else if !dir.join("device").exists() {
            // No backing bus device: bridges, veths, tunnels.
            InterfaceKind::Virtual
        } else if arphrd == Some(ARPHRD_ETHER) {
            InterfaceKind::Ethernet
        } else {
            InterfaceKind::Unknown
        }
    }

    fn read_attr(&self, dir: &Path, attr: &str) -> Result<String, EnumerationError> {
        fs::read_to_string(dir.join(attr))
            .map(|raw| raw.trim().to_string())
            .map_err(|e| {
                EnumerationError::new(format!("reading {}", dir.join(attr).display()), e.to_string())
            })
    }
}

impl DeviceLister for SysfsLister {
    fn list(&self) -> Result<Vec<String>, EnumerationError> {
        let entries = fs::read_dir(&self.base).map_err(|e| {
            EnumerationError::new(format!("reading {}", self.base.display()), e.to_string())
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                EnumerationError::new(format!("iterating {}", self.base.display()), e.to_string())
            })?;
            // Plain files such as `bonding_masters` live here too.
            if !entry.path().is_dir() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }

    fn snapshot(&self, interface: &str) -> Result<Interface, EnumerationError> {
        let dir = self.base.join(interface);
        if interface.is_empty() || !dir.is_dir() {
            return Err(EnumerationError::new(
                format!("looking up {}", interface),
                "no such device",
            ));
        }

        let flags_raw = self.read_attr(&dir, "flags")?;
        let flags = u32::from_str_radix(flags_raw.trim_start_matches("0x"), 16).map_err(|e| {
            EnumerationError::new(format!("parsing flags of {}", interface), e.to_string())
        })?;
        let admin_state = if flags & libc::IFF_UP as u32 != 0 {
            AdminState::Up
        } else {
            AdminState::Down
        };

        let link_type = match self.read_attr(&dir, "type")?.parse::<u32>() {
            Ok(ARPHRD_IEEE80211_RADIOTAP) => LinkType::Monitor,
            Ok(_) => LinkType::Managed,
            Err(e) => {
                return Err(EnumerationError::new(
                    format!("parsing type of {}", interface),
                    e.to_string(),
                ))
            }
        };

        Ok(Interface {
            name: interface.to_string(),
            admin_state,
            link_type,
            wireless: dir.join("phy80211").exists() || dir.join("wireless").exists(),
        })
    }

    fn details(&self, interface: &Interface) -> InterfaceDetails {
        let dir = self.base.join(&interface.name);
        let kind = self.kind(&dir, interface);
        let mac_address = match kind {
            InterfaceKind::Loopback => None,
            _ => self.read_attr(&dir, "address").ok().filter(|mac| !mac.is_empty()),
        };
        let driver = fs::read_link(dir.join("device").join("driver"))
            .ok()
            .and_then(|target| target.file_name().map(|n| n.to_string_lossy().to_string()));
        let ipv4_address = if self.query_addresses {
            first_ipv4(&interface.name)
        } else {
            None
        };

        InterfaceDetails {
            kind,
            mac_address,
            driver,
            ipv4_address,
        }
    }
}

#[cfg(target_os = "linux")]
fn first_ipv4(interface: &str) -> Option<Ipv4Addr> {
    use crate::runtime::block_on_timeout;
    use std::time::Duration;
    use tracing::debug;

    match block_on_timeout(
        Duration::from_secs(2),
        sozin_netlink::get_ipv4_addresses(interface),
    ) {
        Ok(Some(Ok(addrs))) => addrs.into_iter().next(),
        Ok(Some(Err(e))) => {
            debug!(interface, error = %e, "IPv4 lookup failed");
            None
        }
        Ok(None) => {
            debug!(interface, "IPv4 lookup timed out");
            None
        }
        Err(e) => {
            debug!(interface, error = %e, "IPv4 lookup unavailable");
            None
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn first_ipv4(_interface: &str) -> Option<Ipv4Addr> {
    None
}


#[cfg(test)]
mod tests {
    use super::*;

    fn fake_iface(base: &Path, name: &str, flags: &str, arphrd: u32, wireless: bool) {
        let dir = base.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("flags"), format!("{flags}\n")).unwrap();
        fs::write(dir.join("type"), format!("{arphrd}\n")).unwrap();
        if wireless {
            fs::create_dir_all(dir.join("phy80211")).unwrap();
        }
    }

    #[test]
    fn lists_sorted_names_including_loopback() {
        let dir = tempfile::tempdir().unwrap();
        fake_iface(dir.path(), "wlan0", "0x1003", 1, true);
        fake_iface(dir.path(), "eth0", "0x1002", 1, false);
        fake_iface(dir.path(), "lo", "0x9", 772, false);

        let lister = SysfsLister::new(dir.path());
        assert_eq!(lister.list().unwrap(), vec!["eth0", "lo", "wlan0"]);
    }

    #[test]
    fn snapshot_reads_flags_type_and_phy() {
        let dir = tempfile::tempdir().unwrap();
        fake_iface(dir.path(), "wlan0", "0x1003", 803, true);
        fake_iface(dir.path(), "eth0", "0x1002", 1, false);

        let lister = SysfsLister::new(dir.path());

        let wlan = lister.snapshot("wlan0").unwrap();
        assert_eq!(wlan.admin_state, AdminState::Up);
        assert_eq!(wlan.link_type, LinkType::Monitor);
        assert!(wlan.wireless);

        let eth = lister.snapshot("eth0").unwrap();
        assert_eq!(eth.admin_state, AdminState::Down);
        assert_eq!(eth.link_type, LinkType::Managed);
        assert!(!eth.wireless);
    }

    #[test]
    fn stray_files_in_the_device_table_are_not_interfaces() {
        let dir = tempfile::tempdir().unwrap();
        fake_iface(dir.path(), "eth0", "0x1003", 1, false);
        fs::write(dir.path().join("bonding_masters"), "\n").unwrap();

        let lister = SysfsLister::new(dir.path());
        assert_eq!(lister.list().unwrap(), vec!["eth0"]);
        assert!(lister.snapshot("bonding_masters").is_err());
    }

    #[test]
    fn operating_on_a_stray_file_is_rejected_as_not_found() {
        use crate::config::EngineConfig;
        use crate::engine::InterfaceEngine;
        use crate::error::{EngineError, ValidationError};
        use crate::intent::OperationIntent;
        use super::mock::MockNetOps;
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        fake_iface(dir.path(), "eth0", "0x1003", 1, false);
        fs::write(dir.path().join("bonding_masters"), "\n").unwrap();
        let runner = MockNetOps::new();
        let engine = InterfaceEngine::new(
            Arc::new(SysfsLister::new(dir.path())),
            Arc::new(runner.clone()),
            EngineConfig::default(),
        );

        let err = engine
            .execute(&OperationIntent::BringUp {
                interface: "bonding_masters".to_string(),
            })
            .unwrap_err();

        assert_eq!(
            err,
            EngineError::Validation(ValidationError::NotFound {
                name: "bonding_masters".to_string()
            })
        );
        assert!(runner.executed().is_empty());
    }

    #[test]
    fn details_read_mac_driver_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("net");
        fake_iface(&base, "wlan0", "0x1003", 1, true);
        fake_iface(&base, "enp3s0", "0x1003", 1, false);
        fake_iface(&base, "br0", "0x1003", 1, false);
        fake_iface(&base, "lo", "0x9", 772, false);
        fs::write(base.join("wlan0/address"), "00:11:22:33:44:55\n").unwrap();
        fs::write(base.join("enp3s0/address"), "aa:bb:cc:dd:ee:ff\n").unwrap();
        fs::write(base.join("lo/address"), "00:00:00:00:00:00\n").unwrap();
        for (iface, driver) in [("wlan0", "iwlwifi"), ("enp3s0", "r8169")] {
            let driver_dir = dir.path().join("drivers").join(driver);
            fs::create_dir_all(&driver_dir).unwrap();
            fs::create_dir_all(base.join(iface).join("device")).unwrap();
            std::os::unix::fs::symlink(&driver_dir, base.join(iface).join("device/driver"))
                .unwrap();
        }

        let lister = SysfsLister::new(&base);
        let details = |name: &str| lister.details(&lister.snapshot(name).unwrap());

        let wlan = details("wlan0");
        assert_eq!(wlan.kind, InterfaceKind::Wireless);
        assert_eq!(wlan.mac_address.as_deref(), Some("00:11:22:33:44:55"));
        assert_eq!(wlan.driver.as_deref(), Some("iwlwifi"));
        assert_eq!(wlan.ipv4_address, None);

        let eth = details("enp3s0");
        assert_eq!(eth.kind, InterfaceKind::Ethernet);
        assert_eq!(eth.driver.as_deref(), Some("r8169"));

        let bridge = details("br0");
        assert_eq!(bridge.kind, InterfaceKind::Virtual);
        assert_eq!(bridge.mac_address, None);
        assert_eq!(bridge.driver, None);

        let lo = details("lo");
        assert_eq!(lo.kind, InterfaceKind::Loopback);
        assert_eq!(lo.mac_address, None);
    }

    #[test]
    fn listing_pairs_each_interface_with_its_details() {
        let dir = tempfile::tempdir().unwrap();
        fake_iface(dir.path(), "wlan0", "0x1003", 1, true);
        fake_iface(dir.path(), "eth0", "0x1002", 1, false);
        fs::create_dir_all(dir.path().join("eth0/device")).unwrap();

        let lister = SysfsLister::new(dir.path());

        let all = listing(&lister, false).unwrap();
        let kinds: Vec<_> = all
            .iter()
            .map(|row| (row.interface.name.as_str(), row.details.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![("eth0", InterfaceKind::Ethernet), ("wlan0", InterfaceKind::Wireless)]
        );

        let wireless = listing(&lister, true).unwrap();
        assert_eq!(wireless.len(), 1);
        assert_eq!(wireless[0].interface.name, "wlan0");
    }

    #[test]
    fn missing_directory_is_an_enumeration_error() {
        let lister = SysfsLister::new("/nonexistent/sozin/sys/class/net");
        assert!(lister.list().is_err());
        assert!(lister.snapshot("eth0").is_err());
    }

    #[test]
    fn unparsable_flags_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        fake_iface(dir.path(), "eth0", "garbage", 1, false);

        let err = SysfsLister::new(dir.path()).snapshot("eth0").unwrap_err();
        assert!(err.context.contains("flags"));
    }

    #[test]
    fn wireless_only_filters_wired_devices() {
        let dir = tempfile::tempdir().unwrap();
        fake_iface(dir.path(), "wlan0", "0x1003", 1, true);
        fake_iface(dir.path(), "eth0", "0x1003", 1, false);

        let lister = SysfsLister::new(dir.path());
        let names = lister.list().unwrap();
        assert_eq!(wireless_only(&lister, &names), vec!["wlan0"]);
    }
}
