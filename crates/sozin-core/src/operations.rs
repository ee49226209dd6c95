use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::{default_root, EngineConfig};
use crate::engine::InterfaceEngine;
use crate::intent::OperationIntent;
use crate::ops::{listing, DeviceLister, SysfsLister};
use crate::render::{render_json, render_listing, render_text};
use crate::runner::NetlinkRunner;

/// Outcome of one non-interactive command.
#[derive(Debug)]
pub struct HandlerResult {
    /// False when an operation ran and failed
    pub ok: bool,
    pub message: String,
    pub data: Value,
}

pub fn resolve_root(cli_root: Option<PathBuf>) -> PathBuf {
    cli_root.unwrap_or_else(default_root)
}

/// Environment config with command-line flags layered on top.
pub fn engine_config(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(ms) = cli.step_timeout_ms.filter(|ms| *ms > 0) {
        config.step_timeout = Duration::from_millis(ms);
    }
    if cli.verify {
        config.verify_postconditions = true;
    }
    if let Some(recovery) = cli.recovery {
        config.recovery = recovery;
    }
    config
}

/// Engine wired to sysfs for reads and netlink / D-Bus for changes.
pub fn build_engine(config: EngineConfig) -> InterfaceEngine {
    let runner = NetlinkRunner::new(&config);
    InterfaceEngine::new(Arc::new(SysfsLister::default()), Arc::new(runner), config)
}

#[cfg(unix)]
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

/// The intent behind a one-shot subcommand; `None` for `list` and `menu`.
pub fn intent_for(command: &Commands) -> Option<OperationIntent> {
    match command {
        Commands::Menu | Commands::List(_) => None,
        Commands::Monitor(args) if args.disable => Some(OperationIntent::DisableMonitor {
            interface: args.interface.clone(),
        }),
        Commands::Monitor(args) => Some(OperationIntent::EnableMonitor {
            interface: args.interface.clone(),
        }),
        Commands::Up(args) => Some(OperationIntent::BringUp {
            interface: args.interface.clone(),
        }),
        Commands::Down(args) => Some(OperationIntent::BringDown {
            interface: args.interface.clone(),
        }),
        Commands::Rename(args) => Some(OperationIntent::Rename {
            interface: args.interface.clone(),
            new_name: args.new_name.clone(),
        }),
        Commands::Restart => Some(OperationIntent::RestartNetworkManager),
    }
}

pub fn dispatch_command(engine: &InterfaceEngine, command: Commands) -> Result<HandlerResult> {
    match command {
        Commands::List(args) => handle_list(engine.lister(), args.wireless),
        other => match intent_for(&other) {
            Some(intent) => handle_operation(engine, &intent),
            None => anyhow::bail!("the interactive menu cannot be dispatched as a command"),
        },
    }
}

fn handle_list(lister: &dyn DeviceLister, wireless: bool) -> Result<HandlerResult> {
    let interfaces = listing(lister, wireless).context("listing interfaces")?;

    Ok(HandlerResult {
        ok: true,
        message: render_listing(&interfaces),
        data: json!({ "interfaces": interfaces }),
    })
}

fn handle_operation(engine: &InterfaceEngine, intent: &OperationIntent) -> Result<HandlerResult> {
    let result = engine
        .execute(intent)
        .with_context(|| format!("cannot {}", intent.label()))?;
    info!(intent = intent.label(), success = result.is_success(), "Command finished");

    Ok(HandlerResult {
        ok: result.is_success(),
        message: render_text(intent, &result),
        data: render_json(intent, &result),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{InterfaceArgs, ListArgs, MonitorArgs};
    use crate::config::RecoveryPolicy;
    use crate::model::AdminState;
    use crate::ops::mock::MockNetOps;
    use clap::Parser;

    fn engine(mock: &MockNetOps) -> InterfaceEngine {
        InterfaceEngine::new(
            Arc::new(mock.clone()),
            Arc::new(mock.clone()),
            EngineConfig::default(),
        )
    }

    #[test]
    fn flags_override_environment() {
        let cli = Cli::try_parse_from([
            "sozin",
            "--verify",
            "--recovery",
            "revert",
            "--step-timeout-ms",
            "750",
            "list",
        ])
        .unwrap();

        let config = engine_config(&cli);
        assert!(config.verify_postconditions);
        assert_eq!(config.recovery, RecoveryPolicy::Revert);
        assert_eq!(config.step_timeout, Duration::from_millis(750));
    }

    #[test]
    fn monitor_disable_maps_to_disable_intent() {
        let command = Commands::Monitor(MonitorArgs {
            interface: "wlan0".to_string(),
            disable: true,
        });
        assert_eq!(
            intent_for(&command),
            Some(OperationIntent::DisableMonitor {
                interface: "wlan0".to_string()
            })
        );
        assert_eq!(intent_for(&Commands::Menu), None);
    }

    #[test]
    fn list_wireless_filters_and_serializes() {
        let mock = MockNetOps::new();
        mock.add_interface("eth0", false, AdminState::Up);
        mock.add_interface("wlan0", true, AdminState::Down);

        let result = dispatch_command(&engine(&mock), Commands::List(ListArgs { wireless: true }))
            .unwrap();

        assert!(result.ok);
        assert!(!result.message.contains("eth0"));
        assert_eq!(result.data["interfaces"][0]["name"], "wlan0");
        assert_eq!(result.data["interfaces"][0]["admin_state"], "down");
        assert_eq!(result.data["interfaces"][0]["kind"], "wireless");
    }

    #[test]
    fn rejected_operation_is_an_error_with_context() {
        let mock = MockNetOps::new();
        mock.add_interface("eth0", false, AdminState::Up);

        let err = dispatch_command(
            &engine(&mock),
            Commands::Up(InterfaceArgs {
                interface: "wlan7".to_string(),
            }),
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "cannot bring interface up");
        assert!(format!("{:#}", err).contains("'wlan7' does not exist"));
        assert!(mock.executed().is_empty());
    }

    #[test]
    fn failed_operation_is_reported_not_raised() {
        let mock = MockNetOps::new();
        mock.add_interface("eth0", false, AdminState::Down);
        mock.fail_on(
            crate::intent::PrimitiveStep::set_state("eth0", AdminState::Up),
            "Operation not permitted",
        );

        let result = dispatch_command(
            &engine(&mock),
            Commands::Up(InterfaceArgs {
                interface: "eth0".to_string(),
            }),
        )
        .unwrap();

        assert!(!result.ok);
        assert_eq!(result.data["result"]["status"], "failed");
        assert!(result.message.contains("eth0 is DOWN"));
    }
}
