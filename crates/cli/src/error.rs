use std::path::PathBuf;

use thiserror::Error;

use crate::output::ErrorCode;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid config {path}: {source}")]
	Config {
		path: PathBuf,
		#[source]
		source: tabcast::Error,
	},

	#[error("config file not found: {0}")]
	ConfigMissing(PathBuf),

	#[error("invalid catalog {path}: {source}")]
	Catalog {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("cannot read {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("relay failed: {0:#}")]
	Relay(#[source] anyhow::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::Config { .. } | CliError::ConfigMissing(_) => ErrorCode::InvalidConfig,
			CliError::Catalog { .. } => ErrorCode::InvalidCatalog,
			CliError::Relay(_) => ErrorCode::RelayFailed,
			CliError::Read { .. } | CliError::Io(_) => ErrorCode::IoError,
			CliError::Json(_) => ErrorCode::InvalidInput,
		}
	}

	/// Usage problems exit with 2, runtime failures with 1.
	pub fn exit_code(&self) -> i32 {
		match self {
			CliError::Config { .. } | CliError::ConfigMissing(_) | CliError::Catalog { .. } => 2,
			_ => 1,
		}
	}
}
