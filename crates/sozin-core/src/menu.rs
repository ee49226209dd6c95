//! Interactive menu: pick an operation, pick an interface, run it, repeat.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::debug;

use crate::engine::InterfaceEngine;
use crate::intent::OperationIntent;
use crate::ops::listing;
use crate::render::{render_engine_error, render_listing, render_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuEntry {
    EnableMonitor,
    DisableMonitor,
    BringUp,
    BringDown,
    Rename,
    RestartNetworkManager,
    Exit,
}

impl MenuEntry {
    const ALL: [MenuEntry; 7] = [
        MenuEntry::EnableMonitor,
        MenuEntry::DisableMonitor,
        MenuEntry::BringUp,
        MenuEntry::BringDown,
        MenuEntry::Rename,
        MenuEntry::RestartNetworkManager,
        MenuEntry::Exit,
    ];

    fn title(self) -> &'static str {
        match self {
            MenuEntry::EnableMonitor => "Enable Monitor Mode",
            MenuEntry::DisableMonitor => "Disable Monitor Mode",
            MenuEntry::BringUp => "Bring Interface Up",
            MenuEntry::BringDown => "Bring Interface Down",
            MenuEntry::Rename => "Rename Interface",
            MenuEntry::RestartNetworkManager => "Restart NetworkManager",
            MenuEntry::Exit => "Exit",
        }
    }

    fn wireless_only(self) -> bool {
        matches!(self, MenuEntry::EnableMonitor | MenuEntry::DisableMonitor)
    }
}

pub struct Menu<'a, R, W> {
    engine: &'a InterfaceEngine,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(engine: &'a InterfaceEngine, input: R, output: W) -> Self {
        Self {
            engine,
            input,
            output,
        }
    }

    /// Runs until the operator picks Exit, declines another operation, or
    /// input ends.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let Some(entry) = self.choose_entry()? else {
                return Ok(());
            };
            if entry == MenuEntry::Exit {
                return Ok(());
            }

            if let Some(intent) = self.build_intent(entry)? {
                self.perform(&intent)?;
            }

            if !self.confirm("Perform another operation? [y/N]: ")? {
                return Ok(());
            }
        }
    }

    fn choose_entry(&mut self) -> Result<Option<MenuEntry>> {
        loop {
            writeln!(self.output)?;
            for (i, entry) in MenuEntry::ALL.iter().enumerate() {
                writeln!(self.output, "{}. {}", i + 1, entry.title())?;
            }
            let Some(answer) = self.prompt("Select an option: ")? else {
                return Ok(None);
            };
            match answer.parse::<usize>() {
                Ok(n) if (1..=MenuEntry::ALL.len()).contains(&n) => {
                    return Ok(Some(MenuEntry::ALL[n - 1]))
                }
                _ => writeln!(self.output, "Invalid choice '{}'", answer)?,
            }
        }
    }

    /// `None` when there is nothing to operate on or input ended.
    fn build_intent(&mut self, entry: MenuEntry) -> Result<Option<OperationIntent>> {
        if entry == MenuEntry::RestartNetworkManager {
            return Ok(Some(OperationIntent::RestartNetworkManager));
        }

        let Some(interface) = self.choose_interface(entry.wireless_only())? else {
            return Ok(None);
        };

        let intent = match entry {
            MenuEntry::EnableMonitor => OperationIntent::EnableMonitor { interface },
            MenuEntry::DisableMonitor => OperationIntent::DisableMonitor { interface },
            MenuEntry::BringUp => OperationIntent::BringUp { interface },
            MenuEntry::BringDown => OperationIntent::BringDown { interface },
            MenuEntry::Rename => {
                let Some(new_name) = self.prompt("New interface name: ")? else {
                    return Ok(None);
                };
                OperationIntent::Rename {
                    interface,
                    new_name,
                }
            }
            MenuEntry::RestartNetworkManager | MenuEntry::Exit => return Ok(None),
        };
        Ok(Some(intent))
    }

    fn choose_interface(&mut self, wireless: bool) -> Result<Option<String>> {
        let engine = self.engine;
        let lister = engine.lister();
        let interfaces = match listing(lister, wireless) {
            Ok(interfaces) => interfaces,
            Err(err) => {
                writeln!(self.output, "Error: {}", err)?;
                return Ok(None);
            }
        };

        if interfaces.is_empty() {
            let kind = if wireless { "wireless " } else { "" };
            writeln!(self.output, "No {}interfaces found", kind)?;
            return Ok(None);
        }

        writeln!(self.output, "{}", render_listing(&interfaces))?;
        loop {
            let Some(answer) = self.prompt("Select an interface: ")? else {
                return Ok(None);
            };
            if let Ok(n) = answer.parse::<usize>() {
                if let Some(iface) = n.checked_sub(1).and_then(|i| interfaces.get(i)) {
                    return Ok(Some(iface.interface.name.clone()));
                }
            }
            if let Some(iface) = interfaces.iter().find(|iface| iface.interface.name == answer) {
                return Ok(Some(iface.interface.name.clone()));
            }
            writeln!(self.output, "Invalid choice '{}'", answer)?;
        }
    }

    fn perform(&mut self, intent: &OperationIntent) -> Result<()> {
        debug!(intent = intent.label(), "Menu selection");
        let text = match self.engine.execute(intent) {
            Ok(result) => render_text(intent, &result),
            Err(err) => render_engine_error(intent, &err),
        };
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self
            .prompt(question)?
            .map(|answer| matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false))
    }

    /// Trimmed line of input, `None` at end of input.
    fn prompt(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("reading menu input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{AdminState, LinkType};
    use crate::ops::mock::MockNetOps;
    use std::io::Cursor;
    use std::sync::Arc;

    fn setup() -> (MockNetOps, InterfaceEngine) {
        let mock = MockNetOps::new();
        mock.add_interface("eth0", false, AdminState::Up);
        mock.add_interface("wlan0", true, AdminState::Up);
        let engine = InterfaceEngine::new(
            Arc::new(mock.clone()),
            Arc::new(mock.clone()),
            EngineConfig::default(),
        );
        (mock, engine)
    }

    fn drive(engine: &InterfaceEngine, input: &str) -> String {
        let mut output = Vec::new();
        Menu::new(engine, Cursor::new(input.as_bytes()), &mut output)
            .run()
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn exit_runs_nothing() {
        let (mock, engine) = setup();
        let output = drive(&engine, "7\n");
        assert!(output.contains("1. Enable Monitor Mode"));
        assert!(output.contains("7. Exit"));
        assert!(mock.executed().is_empty());
    }

    #[test]
    fn monitor_choice_lists_wireless_interfaces_only() {
        let (mock, engine) = setup();
        let output = drive(&engine, "1\n1\nn\n");

        assert!(!output.contains("eth0 is"));
        assert!(output.contains("Enable monitor mode: done"));
        assert_eq!(mock.state("wlan0").unwrap().link_type, LinkType::Monitor);
    }

    #[test]
    fn rename_then_another_operation() {
        let (mock, engine) = setup();
        // eth0 is listed first, wlan0 second.
        let output = drive(&engine, "5\n2\nmon0\ny\n4\neth0\nno\n");

        assert!(output.contains("Rename interface: done"));
        assert!(output.contains("mon0 is UP"));
        assert!(mock.state("mon0").is_some());
        assert_eq!(mock.state("eth0").unwrap().admin_state, AdminState::Down);
    }

    #[test]
    fn invalid_entries_are_asked_again() {
        let (mock, engine) = setup();
        let output = drive(&engine, "9\nfoo\n3\n5\n1\nn\n");

        assert!(output.contains("Invalid choice '9'"));
        assert!(output.contains("Invalid choice 'foo'"));
        assert!(output.contains("Invalid choice '5'"));
        assert!(output.contains("Bring interface up: done"));
        assert_eq!(mock.executed().len(), 1);
    }

    #[test]
    fn rejected_intent_is_reported_and_menu_continues() {
        let (mock, engine) = setup();
        let output = drive(&engine, "5\n1\nwlan0\ny\n7\n");

        assert!(output.contains("rejected"));
        assert!(output.contains("already exists"));
        assert!(mock.executed().is_empty());
    }

    #[test]
    fn end_of_input_ends_the_session() {
        let (_mock, engine) = setup();
        drive(&engine, "1\n");
        drive(&engine, "");
    }

    #[test]
    fn no_wireless_devices_is_reported() {
        let mock = MockNetOps::new();
        mock.add_interface("eth0", false, AdminState::Up);
        let engine = InterfaceEngine::new(
            Arc::new(mock.clone()),
            Arc::new(mock.clone()),
            EngineConfig::default(),
        );

        let output = drive(&engine, "2\nn\n");
        assert!(output.contains("No wireless interfaces found"));
    }
}
