//! Human and JSON views of engine results.

use serde_json::{json, Value};

use crate::error::EngineError;
use crate::intent::OperationIntent;
use crate::model::ListedInterface;
use crate::result::{FinalState, OperationResult, RecoveryOutcome, StateSource};

pub fn recovery_label(outcome: RecoveryOutcome) -> &'static str {
    match outcome {
        RecoveryOutcome::Restored => "restored (original name and mode)",
        RecoveryOutcome::PartiallyApplied => "partially applied (interface left DOWN)",
        RecoveryOutcome::Unknown => "unknown (check the interface manually)",
    }
}

fn final_state_line(state: &FinalState) -> String {
    let source = match state.source {
        StateSource::Observed => "observed",
        StateSource::Tracked => "tracked, could not read back",
    };
    format!("Interface {} [{}]", state.interface, source)
}

/// Multi-line text for one result. Step numbers are 1-based here.
pub fn render_text(intent: &OperationIntent, result: &OperationResult) -> String {
    let mut lines = Vec::new();
    match result {
        OperationResult::Success { final_state } => {
            lines.push(format!("{}: done", capitalize(intent.label())));
            if let Some(state) = final_state {
                lines.push(final_state_line(state));
            }
        }
        OperationResult::Failed(failure) => {
            lines.push(format!(
                "{}: failed at step {} ({})",
                capitalize(intent.label()),
                failure.step_index + 1,
                failure.step
            ));
            lines.push(format!("  Error: {}", failure.reason));
            if let Some(outcome) = failure.recovery {
                lines.push(format!("  Recovery: {}", recovery_label(outcome)));
            }
            for rollback in &failure.rollback_errors {
                lines.push(format!("  Rollback failed: {}", rollback));
            }
            if let Some(state) = &failure.final_state {
                lines.push(final_state_line(state));
            }
        }
    }
    lines.join("\n")
}

pub fn render_json(intent: &OperationIntent, result: &OperationResult) -> Value {
    json!({
        "intent": intent,
        "result": result,
    })
}

pub fn render_engine_error(intent: &OperationIntent, err: &EngineError) -> String {
    format!("{}: rejected: {}", capitalize(intent.label()), err)
}

pub fn render_listing(interfaces: &[ListedInterface]) -> String {
    if interfaces.is_empty() {
        return "No interfaces found".to_string();
    }
    interfaces
        .iter()
        .enumerate()
        .map(|(i, iface)| format!("{:>2}. {}", i + 1, iface))
        .collect::<Vec<_>>()
        .join("\n")
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExecutionError, RollbackError};
    use crate::intent::PrimitiveStep;
    use crate::model::{AdminState, Interface, InterfaceDetails, InterfaceKind, LinkType};
    use crate::result::Failure;

    fn wlan0(admin_state: AdminState, link_type: LinkType) -> Interface {
        Interface {
            name: "wlan0".to_string(),
            admin_state,
            link_type,
            wireless: true,
        }
    }

    fn enable_monitor() -> OperationIntent {
        OperationIntent::EnableMonitor {
            interface: "wlan0".to_string(),
        }
    }

    #[test]
    fn success_shows_name_and_state() {
        let result = OperationResult::Success {
            final_state: Some(FinalState {
                interface: wlan0(AdminState::Up, LinkType::Monitor),
                source: StateSource::Observed,
            }),
        };

        let text = render_text(&enable_monitor(), &result);
        assert!(text.starts_with("Enable monitor mode: done"));
        assert!(text.contains("wlan0 is UP (monitor mode)"));
    }

    #[test]
    fn failure_shows_one_based_step_and_rollback_errors() {
        let up = PrimitiveStep::set_state("wlan0", AdminState::Up);
        let down = PrimitiveStep::set_state("wlan0", AdminState::Down);
        let result = OperationResult::Failed(Failure {
            step_index: 2,
            step: up.clone(),
            reason: ExecutionError::failed(&up, "Operation not permitted"),
            recovery: Some(RecoveryOutcome::Unknown),
            rollback_errors: vec![RollbackError {
                step: down.clone(),
                source: ExecutionError::failed(&down, "No such device"),
            }],
            final_state: Some(FinalState {
                interface: wlan0(AdminState::Down, LinkType::Monitor),
                source: StateSource::Tracked,
            }),
        });

        let text = render_text(&enable_monitor(), &result);
        assert!(text.contains("failed at step 3 (set wlan0 UP)"));
        assert!(text.contains("Operation not permitted"));
        assert!(text.contains("Recovery: unknown"));
        assert!(text.contains("No such device"));
        assert!(text.contains("wlan0 is DOWN"));
        assert!(text.contains("tracked"));

        let json = render_json(&enable_monitor(), &result);
        assert_eq!(json["result"]["status"], "failed");
        assert_eq!(json["result"]["step_index"], 2);
        assert_eq!(json["result"]["recovery"], "unknown");
    }

    #[test]
    fn restored_after_first_step_failure_does_not_claim_down() {
        let down = PrimitiveStep::set_state("eth0", AdminState::Down);
        let result = OperationResult::Failed(Failure {
            step_index: 0,
            step: down.clone(),
            reason: ExecutionError::failed(&down, "Operation not permitted"),
            recovery: Some(RecoveryOutcome::Restored),
            rollback_errors: Vec::new(),
            final_state: Some(FinalState {
                interface: Interface {
                    name: "eth0".to_string(),
                    admin_state: AdminState::Up,
                    link_type: LinkType::Managed,
                    wireless: false,
                },
                source: StateSource::Observed,
            }),
        });

        let text = render_text(
            &OperationIntent::BringDown {
                interface: "eth0".to_string(),
            },
            &result,
        );
        let recovery = text
            .lines()
            .find(|line| line.contains("Recovery:"))
            .unwrap();
        assert_eq!(recovery, "  Recovery: restored (original name and mode)");
        assert!(!recovery.contains("DOWN"));
        assert!(text.contains("Interface eth0 is UP [observed]"));
    }

    #[test]
    fn restart_failure_has_no_recovery_line() {
        let step = PrimitiveStep::RestartService {
            unit: "NetworkManager.service".to_string(),
        };
        let result = OperationResult::Failed(Failure {
            step_index: 0,
            step: step.clone(),
            reason: ExecutionError::failed(&step, "Unit not found"),
            recovery: None,
            rollback_errors: Vec::new(),
            final_state: None,
        });

        let text = render_text(&OperationIntent::RestartNetworkManager, &result);
        assert!(text.starts_with("Restart NetworkManager: failed at step 1"));
        assert!(!text.contains("Recovery"));
    }

    #[test]
    fn listing_is_numbered_from_one() {
        let row = ListedInterface {
            interface: wlan0(AdminState::Down, LinkType::Managed),
            details: InterfaceDetails {
                kind: InterfaceKind::Wireless,
                mac_address: Some("00:11:22:33:44:55".to_string()),
                ..InterfaceDetails::default()
            },
        };
        let text = render_listing(&[row]);
        assert_eq!(
            text,
            " 1. wlan0 is DOWN (managed mode) [Wireless] 00:11:22:33:44:55"
        );
        assert_eq!(render_listing(&[]), "No interfaces found");
    }
}
