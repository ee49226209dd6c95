//! Interface operation engine behind the `sozin` binary.
//!
//! Each user request becomes an [`OperationIntent`], which the
//! [`InterfaceEngine`] expands into kernel-level [`PrimitiveStep`]s and runs
//! in order. On failure the interface is left DOWN rather than UP in a
//! half-configured mode, and the result says how far it got.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod intent;
pub mod menu;
pub mod model;
pub mod operations;
pub mod ops;
pub mod render;
pub mod result;
pub mod runner;
pub mod runtime;
pub mod validation;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::{EngineConfig, RecoveryPolicy};
pub use engine::InterfaceEngine;
pub use error::{EngineError, EnumerationError, ExecutionError, RollbackError, ValidationError};
pub use intent::{OperationIntent, PrimitiveStep};
pub use menu::Menu;
pub use model::{
    AdminState, Interface, InterfaceDetails, InterfaceKind, LinkType, ListedInterface,
};
pub use operations::{
    build_engine, dispatch_command, engine_config, intent_for, is_root, resolve_root,
    HandlerResult,
};
pub use ops::{listing, CommandRunner, DeviceLister, SysfsLister};
pub use result::{Failure, FinalState, OperationResult, RecoveryOutcome, StateSource};
pub use runner::NetlinkRunner;
pub use validation::validate_interface_name;
