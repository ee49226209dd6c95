use thiserror::Error;

/// Unified error type for all sozin-netlink operations.
///
/// Messages carry the interface and the requested change so they can be shown
/// to an operator verbatim as the diagnostic of a failed step.
#[derive(Error, Debug)]
pub enum NetlinkError {
    #[error("Interface '{name}' not found. Verify interface exists with 'ip link show'.")]
    InterfaceNotFound { name: String },

    #[error("Failed to get interface index for '{interface}': {reason}")]
    InterfaceIndexError { interface: String, reason: String },

    #[error("Failed to set interface '{interface}' state to {desired_state}: {reason}")]
    SetStateError {
        interface: String,
        desired_state: String,
        reason: String,
    },

    #[error("Failed to rename interface '{interface}' to '{new_name}': {reason}")]
    RenameError {
        interface: String,
        new_name: String,
        reason: String,
    },

    #[error("Failed to set wireless interface '{interface}' to {mode} mode: {reason}")]
    WirelessModeError {
        interface: String,
        mode: String,
        reason: String,
    },

    #[error("Invalid argument: {parameter} = '{value}': {reason}")]
    InvalidArgument {
        parameter: String,
        value: String,
        reason: String,
    },

    #[error("Failed to restart unit '{unit}': {reason}")]
    ServiceRestartError { unit: String, reason: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Operation not supported: {0}")]
    OperationNotSupported(String),

    #[error("Permission denied: {operation}. Root privileges required.")]
    PermissionDenied { operation: String },

    #[error("IO error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {timeout_ms}ms waiting for {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Runtime error: {context}: {reason}")]
    Runtime { context: String, reason: String },
}

pub type Result<T> = std::result::Result<T, NetlinkError>;

impl NetlinkError {
    /// Create an IO error with context
    pub fn io_error(operation: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied {
                operation: operation.into(),
            };
        }
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a runtime error with context
    pub fn runtime(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Runtime {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub(crate) fn empty_name() -> Self {
        Self::InvalidArgument {
            parameter: "interface name".to_string(),
            value: String::new(),
            reason: "Interface name cannot be empty".to_string(),
        }
    }
}
