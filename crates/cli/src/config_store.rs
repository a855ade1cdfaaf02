//! On-disk panel configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tabcast::PanelConfig;

use crate::error::{CliError, Result};

const CONFIG_FILE: &str = "tabcast/config.json";

/// Default location of the config file.
///
/// Uses `$XDG_CONFIG_HOME/tabcast/config.json`, then the platform config
/// directory, then the working directory.
pub fn default_config_path() -> PathBuf {
	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(dirs::config_dir)
		.unwrap_or_else(|| PathBuf::from("."));
	config_path_in(&config_home)
}

pub fn config_path_in(config_home: &Path) -> PathBuf {
	config_home.join(CONFIG_FILE)
}

/// Effective configuration and the file it came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedConfig {
	pub config: PanelConfig,
	/// `None` when no file existed and defaults apply.
	pub path: Option<PathBuf>,
}

impl LoadedConfig {
	/// Loads from an explicit path (which must exist) or the default location
	/// (which may be absent).
	pub fn load(explicit: Option<&Path>) -> Result<Self> {
		match explicit {
			Some(path) => match read_config(path)? {
				Some(config) => Ok(Self {
					config,
					path: Some(path.to_path_buf()),
				}),
				None => Err(CliError::ConfigMissing(path.to_path_buf())),
			},
			None => Self::load_or_default(&default_config_path()),
		}
	}

	pub fn load_or_default(path: &Path) -> Result<Self> {
		Ok(match read_config(path)? {
			Some(config) => Self {
				config,
				path: Some(path.to_path_buf()),
			},
			None => {
				tracing::debug!(path = %path.display(), "no config file, using defaults");
				Self {
					config: PanelConfig::default(),
					path: None,
				}
			}
		})
	}
}

fn read_config(path: &Path) -> Result<Option<PanelConfig>> {
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(source) => {
			return Err(CliError::Read {
				path: path.to_path_buf(),
				source,
			});
		}
	};
	PanelConfig::from_json(&raw)
		.map(Some)
		.map_err(|source| CliError::Config {
			path: path.to_path_buf(),
			source,
		})
}
