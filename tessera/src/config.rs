//! TOML configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tessera_core::cell::Rgb;

/// Default font size in points.
pub const FONT_SIZE: f32 = 16.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error in {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub font: FontConfig,
    pub terminal: TerminalConfig,
    pub colors: ColorConfig,
    pub log: LogConfig,
    /// Widgets created at startup, in order.
    #[serde(rename = "widget", skip_serializing_if = "Vec::is_empty")]
    pub widgets: Vec<WidgetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// TTF/OTF file; system locations are searched when unset.
    pub path: Option<PathBuf>,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Shell command line; `$SHELL` when unset.
    pub shell: Option<String>,
    pub columns: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub foreground: String,
    pub background: String,
    pub bold_is_bright: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// `plugin` or `plugin.kind`.
    pub name: String,
    pub args: String,
    pub payload: String,
    pub z: Option<i32>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: None,
            size: FONT_SIZE,
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            shell: None,
            columns: 100,
            rows: 30,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            foreground: "#d3d7cf".to_owned(),
            background: "#121214".to_owned(),
            bold_is_bright: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            args: String::new(),
            payload: String::new(),
            z: None,
        }
    }
}

impl ColorConfig {
    /// Configured default foreground, falling back to the built-in one.
    pub fn foreground_rgb(&self) -> Rgb {
        parse_hex_color(&self.foreground).unwrap_or(tessera_core::color::palette::DEFAULT_FG)
    }

    pub fn background_rgb(&self) -> Rgb {
        parse_hex_color(&self.background).unwrap_or(tessera_core::color::palette::DEFAULT_BG)
    }
}

/// Parse `#rrggbb` or `rrggbb`.
pub fn parse_hex_color(s: &str) -> Option<Rgb> {
    let hex = s.trim().strip_prefix('#').unwrap_or_else(|| s.trim());
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

/// Return the platform-specific configuration directory for tessera.
pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("tessera");
        }
        PathBuf::from(".").join("tessera")
    }
    #[cfg(not(target_os = "windows"))]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("tessera");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".config").join("tessera");
        }
        PathBuf::from(".").join("tessera")
    }
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl Config {
    /// Load from the default path. Missing or invalid files give defaults.
    pub fn load() -> Self {
        let path = config_path();
        match Self::load_from(&path) {
            Ok(cfg) => {
                log::info!("config: loaded from {}", path.display());
                cfg
            }
            Err(ConfigError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::default()
            }
            Err(e) => {
                log::warn!("config: {e}: {}", error_chain(&e));
                Self::default()
            }
        }
    }

    /// Load from the default path, keeping the failure.
    pub fn try_load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// `Display` of every cause below `err`, joined with `: `.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = String::new();
    let mut source = err.source();
    while let Some(cause) = source {
        if !out.is_empty() {
            out.push_str(": ");
        }
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
