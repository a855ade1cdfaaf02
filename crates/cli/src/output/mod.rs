//! Result envelope for command output.
//!
//! Text output is rendered per command for humans. JSON output wraps the same
//! data in an envelope so scripts can branch on `ok`:
//!
//! ```json
//! { "schemaVersion": 1, "ok": true, "command": "view", "data": { ... } }
//! ```
//!
//! On failure:
//!
//! ```json
//! { "schemaVersion": 1, "ok": false, "command": "view",
//!   "error": { "code": "INVALID_CATALOG", "message": "..." } }
//! ```


use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// Bumped on breaking changes to the envelope shape.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON envelope
	Json,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub schema_version: u32,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

impl<T: Serialize> CommandResult<T> {
	pub fn success(command: impl Into<String>, data: T) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: true,
			command: command.into(),
			data: Some(data),
			error: None,
		}
	}

	pub fn failure(command: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: false,
			command: command.into(),
			data: None,
			error: Some(CommandError {
				code,
				message: message.into(),
			}),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Config file missing or malformed
	InvalidConfig,
	/// Catalog file is not a JSON list of sources
	InvalidCatalog,
	/// Relay could not bind or serve
	RelayFailed,
	IoError,
	InvalidInput,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			ErrorCode::InvalidConfig => "INVALID_CONFIG",
			ErrorCode::InvalidCatalog => "INVALID_CATALOG",
			ErrorCode::RelayFailed => "RELAY_FAILED",
			ErrorCode::IoError => "IO_ERROR",
			ErrorCode::InvalidInput => "INVALID_INPUT",
		};
		write!(f, "{s}")
	}
}

/// Prints `data` for `command`. Text rendering is delegated to `render`.
pub fn print_success<T, F>(command: &str, data: &T, format: OutputFormat, render: F) -> io::Result<()>
where
	T: Serialize,
	F: FnOnce(&T, &mut dyn Write) -> io::Result<()>,
{
	let mut stdout = io::stdout().lock();
	match format {
		OutputFormat::Text => render(data, &mut stdout as &mut dyn Write),
		OutputFormat::Json => {
			let result = CommandResult::success(command, data);
			serde_json::to_writer_pretty(&mut stdout, &result)?;
			writeln!(stdout)
		}
	}
}

pub fn print_failure(command: &str, code: ErrorCode, message: &str, format: OutputFormat) {
	eprintln!("Error [{code}]: {message}");
	if format == OutputFormat::Json {
		let result: CommandResult<()> = CommandResult::failure(command, code, message);
		if let Ok(json) = serde_json::to_string_pretty(&result) {
			println!("{json}");
		}
	}
}
