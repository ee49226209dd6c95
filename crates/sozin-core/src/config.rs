use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::Serialize;

pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_SERVICE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SERVICE_UNIT: &str = "NetworkManager.service";
pub const DEFAULT_ROOT_PATH: &str = "/var/lib/sozin";

/// What the engine does with mutations that were applied before a later
/// step failed. The interface is left DOWN either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryPolicy {
    /// Keep the applied link type / name
    #[default]
    LeaveDown,
    /// Undo applied mutations in reverse order
    Revert,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub step_timeout: Duration,
    pub service_timeout: Duration,
    /// Re-read the interface after every step and fail the step if it did
    /// not take effect
    pub verify_postconditions: bool,
    pub recovery: RecoveryPolicy,
    pub service_unit: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_millis(DEFAULT_STEP_TIMEOUT_MS),
            service_timeout: Duration::from_millis(DEFAULT_SERVICE_TIMEOUT_MS),
            verify_postconditions: false,
            recovery: RecoveryPolicy::LeaveDown,
            service_unit: DEFAULT_SERVICE_UNIT.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let step_timeout = env::var("SOZIN_STEP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.step_timeout);
        let service_timeout = env::var("SOZIN_SERVICE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.service_timeout);
        let verify_postconditions = env_bool("SOZIN_VERIFY", defaults.verify_postconditions);
        let recovery = env::var("SOZIN_RECOVERY")
            .ok()
            .and_then(|v| RecoveryPolicy::from_str(v.trim(), true).ok())
            .unwrap_or(defaults.recovery);
        let service_unit = env::var("SOZIN_SERVICE_UNIT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.service_unit);

        Self {
            step_timeout,
            service_timeout,
            verify_postconditions,
            recovery,
            service_unit,
        }
    }
}

/// Root for logs and config; `SOZIN_ROOT` overrides the default.
pub fn default_root() -> PathBuf {
    env::var("SOZIN_ROOT")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_PATH))
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"),
        Err(_) => default,
    }
}
