use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use imkitchen_mealplan::{BoardView, DragConfig};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub drag: DragConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BoardConfig {
    /// IANA timezone used to decide what "today" is
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub view: BoardView,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            view: BoardView::default(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (IMKITCHEN__BOARD__TIMEZONE, etc.)
    /// 2. Config file specified by path
    /// 3. Hardcoded defaults
    pub fn load(config_path: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder()
            .set_default("board.timezone", default_timezone())?
            .set_default("observability.log_level", default_log_level())?;

        let config_file_path = config_path
            .or_else(|| env::var("CONFIG_PATH").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        // The file is optional
        if std::path::Path::new(&config_file_path).exists() {
            builder = builder.add_source(File::with_name(&config_file_path));
        }

        builder = builder.add_source(
            Environment::with_prefix("IMKITCHEN")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.drag.pointer_activation_distance <= 0.0 {
            return Err("Drag pointer_activation_distance must be greater than 0".to_string());
        }
        if self.drag.touch_activation_tolerance < 0.0 {
            return Err("Drag touch_activation_tolerance must not be negative".to_string());
        }
        if !imkitchen_mealplan::is_known_timezone(&self.board.timezone) {
            return Err(format!("Unknown board timezone '{}'", self.board.timezone));
        }
        Ok(())
    }
}
