use std::path::PathBuf;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::Error;
use crate::errors::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HaSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Startup role; `auto` defers to the HA pairing handshake.
    #[serde(default = "default_role")]
    pub role: String,

    #[serde(default)]
    pub group: String,
}

impl Default for HaSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            role: default_role(),
            group: String::new(),
        }
    }
}

/// Bootstrap settings for the configuration service.
///
/// These are the static, file-provided knobs; everything dynamic lives
/// in the configuration store itself.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceSettings {
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    #[serde(default = "default_config_file")]
    pub dynamic_config_file: String,

    #[serde(default = "default_server_name")]
    pub server_name: String,

    #[serde(default = "default_server_version")]
    pub server_version: String,

    /// Platform serial number feeding UID generation; 7 characters.
    #[serde(default)]
    pub serial_number: Option<String>,

    #[serde(default)]
    pub ha: HaSettings,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            dynamic_config_file: default_config_file(),
            server_name: default_server_name(),
            server_version: default_server_version(),
            serial_number: None,
            ha: HaSettings::default(),
        }
    }
}

impl ServiceSettings {
    /// Load settings from an optional TOML file with an environment
    /// overlay (prefix `DYNCFG`, `__` separator), highest priority last.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("DYNCFG")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.config_dir.as_os_str().is_empty() {
            return Err(Error::Fatal("config_dir cannot be empty".to_string()));
        }
        if self.dynamic_config_file.is_empty() {
            return Err(Error::Fatal(
                "dynamic_config_file cannot be empty".to_string(),
            ));
        }
        if let Some(serial) = &self.serial_number {
            if serial.len() != 7 {
                return Err(Error::Fatal(format!(
                    "serial_number must be 7 characters, got {:?}",
                    serial
                )));
            }
        }
        if self.ha.enabled {
            match self.ha.role.as_str() {
                "primary" | "standby" | "auto" => {}
                other => {
                    return Err(Error::Fatal(format!(
                        "ha.role must be primary, standby or auto, got {:?}",
                        other
                    )));
                }
            }
            if self.ha.group.is_empty() {
                return Err(Error::Fatal(
                    "ha.group is required when HA is enabled".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("config")
}

fn default_config_file() -> String {
    "server_dynamic.json".to_string()
}

fn default_server_name() -> String {
    "server".to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_role() -> String {
    "auto".to_string()
}
