pub mod config;
pub mod fs;
pub mod init;

pub use config::LoggingConfig;
pub use fs::{config_path, read_config, write_config_atomic};
pub use init::{init, LoggingGuards, T_NET};
