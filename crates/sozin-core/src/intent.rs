use std::fmt;

use serde::Serialize;

use crate::model::{AdminState, LinkType};

/// What the operator asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum OperationIntent {
    EnableMonitor { interface: String },
    DisableMonitor { interface: String },
    BringUp { interface: String },
    BringDown { interface: String },
    Rename { interface: String, new_name: String },
    RestartNetworkManager,
}

/// One OS-level mutation request against a single named interface (or, for
/// `RestartService`, a systemd unit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PrimitiveStep {
    SetState { interface: String, state: AdminState },
    SetLinkType { interface: String, link_type: LinkType },
    SetName { interface: String, new_name: String },
    RestartService { unit: String },
}

impl OperationIntent {
    /// The interface this intent acts on, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::EnableMonitor { interface }
            | Self::DisableMonitor { interface }
            | Self::BringUp { interface }
            | Self::BringDown { interface }
            | Self::Rename { interface, .. } => Some(interface),
            Self::RestartNetworkManager => None,
        }
    }

    /// Ordered steps for this intent. Pure: the same intent always yields the
    /// same sequence, whatever happened on a previous attempt.
    pub fn steps(&self, service_unit: &str) -> Vec<PrimitiveStep> {
        match self {
            Self::EnableMonitor { interface } => mode_switch(interface, LinkType::Monitor),
            Self::DisableMonitor { interface } => mode_switch(interface, LinkType::Managed),
            Self::BringUp { interface } => vec![PrimitiveStep::set_state(interface, AdminState::Up)],
            Self::BringDown { interface } => {
                vec![PrimitiveStep::set_state(interface, AdminState::Down)]
            }
            Self::Rename {
                interface,
                new_name,
            } => vec![
                PrimitiveStep::set_state(interface, AdminState::Down),
                PrimitiveStep::SetName {
                    interface: interface.clone(),
                    new_name: new_name.clone(),
                },
                PrimitiveStep::set_state(new_name, AdminState::Up),
            ],
            Self::RestartNetworkManager => vec![PrimitiveStep::RestartService {
                unit: service_unit.to_string(),
            }],
        }
    }

    /// Human label used in logs and menus
    pub fn label(&self) -> &'static str {
        match self {
            Self::EnableMonitor { .. } => "enable monitor mode",
            Self::DisableMonitor { .. } => "disable monitor mode",
            Self::BringUp { .. } => "bring interface up",
            Self::BringDown { .. } => "bring interface down",
            Self::Rename { .. } => "rename interface",
            Self::RestartNetworkManager => "restart NetworkManager",
        }
    }
}

fn mode_switch(interface: &str, link_type: LinkType) -> Vec<PrimitiveStep> {
    vec![
        PrimitiveStep::set_state(interface, AdminState::Down),
        PrimitiveStep::SetLinkType {
            interface: interface.to_string(),
            link_type,
        },
        PrimitiveStep::set_state(interface, AdminState::Up),
    ]
}

impl PrimitiveStep {
    pub fn set_state(interface: &str, state: AdminState) -> Self {
        Self::SetState {
            interface: interface.to_string(),
            state,
        }
    }

    /// Name of the interface the step is issued against.
    pub fn interface(&self) -> Option<&str> {
        match self {
            Self::SetState { interface, .. }
            | Self::SetLinkType { interface, .. }
            | Self::SetName { interface, .. } => Some(interface),
            Self::RestartService { .. } => None,
        }
    }

    /// True for steps that change configuration rather than admin state.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::SetLinkType { .. } | Self::SetName { .. })
    }
}

impl fmt::Display for PrimitiveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetState { interface, state } => write!(f, "set {} {}", interface, state),
            Self::SetLinkType {
                interface,
                link_type,
            } => write!(f, "set {} type {}", interface, link_type),
            Self::SetName {
                interface,
                new_name,
            } => write!(f, "rename {} to {}", interface, new_name),
            Self::RestartService { unit } => write!(f, "restart {}", unit),
        }
    }
}
