use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: String,
    /// Also write daily log files under `<root>/logs`
    #[serde(default = "default_file_logging")]
    pub file_logging: bool,
}

fn default_file_logging() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            file_logging: default_file_logging(),
        }
    }
}
