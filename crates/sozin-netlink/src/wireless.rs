//! nl80211 interface type changes (the `iw dev <if> set type ...` equivalent).

use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::Duration;

use crate::error::{NetlinkError, Result};
use neli::{
    consts::{
        nl::{NlmF, NlmFFlags},
        socket::NlFamily,
    },
    genl::{Genlmsghdr, Nlattr},
    nl::{NlPayload, Nlmsghdr},
    socket::NlSocketHandle,
    types::{Buffer, GenlBuffer},
};

const NL80211_GENL_NAME: &str = "nl80211";
const SYSFS_NET: &str = "/sys/class/net";

// nl80211 commands
const NL80211_CMD_SET_INTERFACE: u8 = 6;

// nl80211 attributes
const NL80211_ATTR_IFINDEX: u16 = 3;
const NL80211_ATTR_IFTYPE: u16 = 5;

// Interface types
const NL80211_IFTYPE_STATION: u32 = 2;
const NL80211_IFTYPE_MONITOR: u32 = 6;

/// Wireless interface operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceMode {
    /// Client mode, called "managed" by iw
    Station,
    Monitor,
}

impl InterfaceMode {
    fn to_nl80211(self) -> u32 {
        match self {
            Self::Station => NL80211_IFTYPE_STATION,
            Self::Monitor => NL80211_IFTYPE_MONITOR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Station => "managed",
            Self::Monitor => "monitor",
        }
    }
}

/// Generic netlink client bound to the nl80211 family.
pub struct WirelessManager {
    socket: NlSocketHandle,
    family_id: u16,
    recv_timeout: Option<Duration>,
}

impl WirelessManager {
    /// Open a generic netlink socket and resolve the nl80211 family.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Cannot create netlink socket (requires CAP_NET_ADMIN)
    /// - nl80211 generic netlink family not found (wireless drivers not loaded)
    pub fn new() -> Result<Self> {
        Self::connect(None)
    }

    /// Like [`WirelessManager::new`], but every receive on the socket (family
    /// lookup and the kernel's ack) gives up after `timeout`. Calls then
    /// return [`NetlinkError::Timeout`] instead of blocking past the caller's
    /// deadline.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Self::connect(Some(timeout))
    }

    fn connect(recv_timeout: Option<Duration>) -> Result<Self> {
        let mut socket = NlSocketHandle::connect(NlFamily::Generic, None, &[]).map_err(|e| {
            NetlinkError::ConnectionFailed(format!("Failed to create nl80211 socket: {}", e))
        })?;
        if let Some(timeout) = recv_timeout {
            set_recv_timeout(&socket, timeout)?;
        }

        let family_id = socket.resolve_genl_family(NL80211_GENL_NAME).map_err(|e| {
            if recv_timeout.is_some() && is_recv_timeout(&e) {
                return timeout_error("nl80211 family lookup", recv_timeout);
            }
            NetlinkError::ConnectionFailed(format!(
                "Failed to resolve nl80211 family (wireless drivers not loaded?): {}",
                e
            ))
        })?;

        Ok(Self {
            socket,
            family_id,
            recv_timeout,
        })
    }

    /// Set interface mode (managed or monitor).
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Interface not found
    /// - Permission denied (requires root)
    /// - Mode not supported by hardware
    /// - Interface is up (must be down to change mode)
    /// - No ack within the receive timeout, if one was set
    pub fn set_mode(&mut self, interface: &str, mode: InterfaceMode) -> Result<()> {
        let ifindex = read_ifindex(Path::new(SYSFS_NET), interface)?;
        let mode_error = |reason: String| NetlinkError::WirelessModeError {
            interface: interface.to_string(),
            mode: mode.as_str().to_string(),
            reason,
        };

        let mut attrs: GenlBuffer<u16, Buffer> = GenlBuffer::new();
        attrs.push(
            Nlattr::new(false, false, NL80211_ATTR_IFINDEX, ifindex)
                .map_err(|e| mode_error(format!("building ifindex attribute: {}", e)))?,
        );
        attrs.push(
            Nlattr::new(false, false, NL80211_ATTR_IFTYPE, mode.to_nl80211())
                .map_err(|e| mode_error(format!("building iftype attribute: {}", e)))?,
        );

        let genlhdr = Genlmsghdr::new(NL80211_CMD_SET_INTERFACE, 1, attrs);
        let nlhdr = Nlmsghdr::new(
            None,
            self.family_id,
            NlmFFlags::new(&[NlmF::Request, NlmF::Ack]),
            None,
            None,
            NlPayload::Payload(genlhdr),
        );

        self.socket
            .send(nlhdr)
            .map_err(|e| mode_error(format!("sending request: {}", e)))?;

        // A kernel error (EBUSY when the interface is up, EOPNOTSUPP for
        // drivers without monitor support) comes back as an Err here.
        let recv_timeout = self.recv_timeout;
        let _ack: Option<Nlmsghdr<u16, Genlmsghdr<u8, u16>>> =
            self.socket.recv().map_err(|e| {
                if recv_timeout.is_some() && is_recv_timeout(&e) {
                    return timeout_error("nl80211 ack", recv_timeout);
                }
                mode_error(e.to_string())
            })?;

        log::info!("Interface {} set to {} mode", interface, mode.as_str());
        Ok(())
    }
}

/// Kernel index of `interface`, read from `<sysfs_net>/<interface>/ifindex`.
fn read_ifindex(sysfs_net: &Path, interface: &str) -> Result<u32> {
    if interface.is_empty() {
        return Err(NetlinkError::empty_name());
    }
    let path = sysfs_net.join(interface).join("ifindex");
    let raw = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => NetlinkError::InterfaceNotFound {
            name: interface.to_string(),
        },
        _ => NetlinkError::io_error(format!("reading {}", path.display()), e),
    })?;

    raw.trim()
        .parse::<u32>()
        .map_err(|e| NetlinkError::InterfaceIndexError {
            interface: interface.to_string(),
            reason: e.to_string(),
        })
}

fn set_recv_timeout(sock: &NlSocketHandle, timeout: Duration) -> Result<()> {
    let fd = sock.as_raw_fd();
    let tv = libc::timeval {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_usec: timeout.subsec_micros() as libc::suseconds_t,
    };
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_RCVTIMEO,
            &tv as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::timeval>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(NetlinkError::io_error(
            "setting nl80211 receive timeout",
            io::Error::last_os_error(),
        ));
    }
    Ok(())
}

/// SO_RCVTIMEO expiry surfaces as EAGAIN through neli's error wrapping.
fn is_recv_timeout(err: &impl std::fmt::Display) -> bool {
    let msg = err.to_string();
    msg.contains("Resource temporarily unavailable")
        || msg.contains("would block")
        || msg.contains("timed out")
}

fn timeout_error(operation: &str, timeout: Option<Duration>) -> NetlinkError {
    NetlinkError::Timeout {
        operation: operation.to_string(),
        timeout_ms: timeout.map(|t| t.as_millis() as u64).unwrap_or_default(),
    }
}
