//! `CommandRunner` that talks to the kernel through sozin-netlink.

use std::future::Future;
use std::time::{Duration, Instant};

use sozin_logging::T_NET;
use sozin_netlink::NetlinkError;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ExecutionError;
use crate::intent::PrimitiveStep;
use crate::ops::CommandRunner;
use crate::runtime::block_on_timeout;

pub struct NetlinkRunner {
    step_timeout: Duration,
    service_timeout: Duration,
}

impl NetlinkRunner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            step_timeout: config.step_timeout,
            service_timeout: config.service_timeout,
        }
    }

    fn timeout_for(&self, step: &PrimitiveStep) -> Duration {
        match step {
            PrimitiveStep::RestartService { .. } => self.service_timeout,
            _ => self.step_timeout,
        }
    }
}

impl CommandRunner for NetlinkRunner {
    fn run(&self, step: &PrimitiveStep) -> Result<(), ExecutionError> {
        let timeout = self.timeout_for(step);
        let started = Instant::now();

        match apply(step, timeout) {
            Ok(()) => {
                debug!(
                    target: T_NET,
                    step = %step,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Kernel accepted step"
                );
                Ok(())
            }
            Err(e) if e.is_timeout() => Err(ExecutionError::timeout(step, timeout)),
            Err(e) => Err(ExecutionError::failed(step, e.to_string())),
        }
    }
}

/// Drive one async netlink or D-Bus call under `timeout`.
fn bounded<F>(step: &PrimitiveStep, timeout: Duration, call: F) -> sozin_netlink::Result<()>
where
    F: Future<Output = sozin_netlink::Result<()>>,
{
    match block_on_timeout(timeout, call) {
        Ok(Some(result)) => result,
        Ok(None) => Err(NetlinkError::Timeout {
            operation: step.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
        Err(e) => Err(NetlinkError::runtime("running netlink call", e.to_string())),
    }
}

#[cfg(target_os = "linux")]
fn apply(step: &PrimitiveStep, timeout: Duration) -> sozin_netlink::Result<()> {
    use crate::model::{AdminState, LinkType};
    use sozin_netlink::InterfaceMode;

    match step {
        PrimitiveStep::SetState {
            interface,
            state: AdminState::Up,
        } => bounded(step, timeout, sozin_netlink::set_interface_up(interface)),
        PrimitiveStep::SetState {
            interface,
            state: AdminState::Down,
        } => bounded(step, timeout, sozin_netlink::set_interface_down(interface)),
        PrimitiveStep::SetName {
            interface,
            new_name,
        } => bounded(
            step,
            timeout,
            sozin_netlink::rename_interface(interface, new_name),
        ),
        PrimitiveStep::SetLinkType {
            interface,
            link_type,
        } => {
            let mode = match link_type {
                LinkType::Managed => InterfaceMode::Station,
                LinkType::Monitor => InterfaceMode::Monitor,
            };
            // Runs on this thread. The kernel handles a genl request inside
            // sendmsg, so when the ack wait gives up nothing is left in flight.
            sozin_netlink::set_wireless_mode_with_timeout(interface, mode, timeout)
        }
        PrimitiveStep::RestartService { unit } => {
            bounded(step, timeout, sozin_netlink::restart_unit(unit))
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn apply(step: &PrimitiveStep, timeout: Duration) -> sozin_netlink::Result<()> {
    match step {
        PrimitiveStep::RestartService { unit } => {
            bounded(step, timeout, sozin_netlink::restart_unit(unit))
        }
        _ => Err(NetlinkError::OperationNotSupported(
            "link changes are supported on Linux only".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AdminState;

    #[test]
    fn service_steps_get_the_longer_timeout() {
        let runner = NetlinkRunner::new(&EngineConfig {
            step_timeout: Duration::from_millis(100),
            service_timeout: Duration::from_millis(900),
            ..EngineConfig::default()
        });

        let restart = PrimitiveStep::RestartService {
            unit: "NetworkManager.service".to_string(),
        };
        assert_eq!(runner.timeout_for(&restart), Duration::from_millis(900));
        assert_eq!(
            runner.timeout_for(&PrimitiveStep::set_state("wlan0", AdminState::Down)),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn call_past_its_deadline_is_a_timeout() {
        let step = PrimitiveStep::set_state("wlan0", AdminState::Up);

        let err = bounded(&step, Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .unwrap_err();

        assert!(err.is_timeout());
        assert!(err.to_string().contains("set wlan0 UP"));
    }

    #[test]
    fn kernel_errors_pass_through_unchanged() {
        let step = PrimitiveStep::set_state("wlan9", AdminState::Up);

        let err = bounded(&step, Duration::from_millis(200), async {
            Err(NetlinkError::InterfaceNotFound {
                name: "wlan9".to_string(),
            })
        })
        .unwrap_err();

        assert!(!err.is_timeout());
        assert!(matches!(err, NetlinkError::InterfaceNotFound { .. }));
    }
}
