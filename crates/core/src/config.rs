//! Panel configuration: [`PanelConfig`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Relay endpoint the panel connects to when nothing else is configured.
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:19988/stream";

/// Default wait after bringing a surface to the foreground.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Upper bound for the settle delay; the wait is never cancellable.
pub const MAX_SETTLE_DELAY_MS: u64 = 10_000;

/// Scheme prefixes the browser host never allows to be captured.
pub const DEFAULT_RESTRICTED_PREFIXES: &[&str] =
	&["chrome://", "chrome-extension://", "edge://", "about:"];

/// Domains listed even when silent, unless the operator asks to show everything.
pub const DEFAULT_AUDIO_SOURCE_DOMAINS: &[&str] = &[
	"youtube.com",
	"music.youtube.com",
	"open.spotify.com",
	"soundcloud.com",
	"deezer.com",
	"music.apple.com",
	"twitch.tv",
	"vimeo.com",
];

/// Panel settings. Every field has a default so partial JSON files load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelConfig {
	pub relay_url: String,
	pub restricted_prefixes: Vec<String>,
	pub audio_source_domains: Vec<String>,
	/// Initial value of the "show all tabs" toggle.
	pub show_all_sources: bool,
	pub settle_delay_ms: u64,
}

impl Default for PanelConfig {
	fn default() -> Self {
		Self {
			relay_url: DEFAULT_RELAY_URL.to_string(),
			restricted_prefixes: DEFAULT_RESTRICTED_PREFIXES
				.iter()
				.map(|s| s.to_string())
				.collect(),
			audio_source_domains: DEFAULT_AUDIO_SOURCE_DOMAINS
				.iter()
				.map(|s| s.to_string())
				.collect(),
			show_all_sources: false,
			settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
		}
	}
}

impl PanelConfig {
	/// Parses and validates a JSON document.
	pub fn from_json(raw: &str) -> Result<Self> {
		let config: PanelConfig = serde_json::from_str(raw)?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects values the controller cannot honor.
	pub fn validate(&self) -> Result<()> {
		if self.settle_delay_ms > MAX_SETTLE_DELAY_MS {
			return Err(Error::Config(format!(
				"settleDelayMs must be at most {MAX_SETTLE_DELAY_MS}, got {}",
				self.settle_delay_ms
			)));
		}
		if self.relay_url.trim().is_empty() {
			return Err(Error::Config("relayUrl must not be empty".to_string()));
		}
		if self.restricted_prefixes.iter().any(|p| p.is_empty()) {
			return Err(Error::Config(
				"restrictedPrefixes must not contain empty entries".to_string(),
			));
		}
		Ok(())
	}

	pub fn settle_delay(&self) -> Duration {
		Duration::from_millis(self.settle_delay_ms)
	}
}
