use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::RecoveryPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "sozin",
    author,
    version,
    about = "Switch wireless interfaces between managed and monitor mode, rename them and toggle link state"
)]
pub struct Cli {
    /// Directory for logs and config (defaults to $SOZIN_ROOT or /var/lib/sozin)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Output format for command results
    #[arg(
        long = "output",
        value_enum,
        default_value_t = OutputFormat::Text,
        global = true
    )]
    pub output_format: OutputFormat,

    /// Per-step timeout for link changes, in milliseconds
    #[arg(long = "step-timeout-ms", global = true)]
    pub step_timeout_ms: Option<u64>,

    /// Read the interface back after every step and fail if the change did not stick
    #[arg(long, global = true)]
    pub verify: bool,

    /// What to do with changes already applied when a later step fails
    #[arg(long, value_enum, global = true)]
    pub recovery: Option<RecoveryPolicy>,

    /// Runs the interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive menu
    Menu,
    /// List network interfaces
    List(ListArgs),
    /// Put a wireless interface into monitor mode (or back to managed)
    Monitor(MonitorArgs),
    /// Bring an interface up
    Up(InterfaceArgs),
    /// Bring an interface down
    Down(InterfaceArgs),
    /// Rename an interface
    Rename(RenameArgs),
    /// Restart the NetworkManager service
    Restart,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show wireless interfaces
    #[arg(long)]
    pub wireless: bool,
}

#[derive(Args, Debug)]
pub struct InterfaceArgs {
    pub interface: String,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    pub interface: String,

    /// Switch back to managed mode instead
    #[arg(long)]
    pub disable: bool,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    pub interface: String,
    pub new_name: String,
}
