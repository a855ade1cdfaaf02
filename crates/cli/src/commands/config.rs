use std::io::{self, Write};

use crate::config_store::LoadedConfig;
use crate::error::Result;
use crate::output::{self, OutputFormat};

pub(super) fn execute(loaded: &LoadedConfig, format: OutputFormat) -> Result<()> {
	output::print_success("config", loaded, format, render_text)?;
	Ok(())
}

fn render_text(loaded: &LoadedConfig, out: &mut dyn Write) -> io::Result<()> {
	match &loaded.path {
		Some(path) => writeln!(out, "# {}", path.display())?,
		None => writeln!(out, "# built-in defaults")?,
	}
	serde_json::to_writer_pretty(&mut *out, &loaded.config)?;
	writeln!(out)
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use tabcast::PanelConfig;

	use super::*;

	#[test]
	fn text_names_the_source_file() {
		let loaded = LoadedConfig {
			config: PanelConfig::default(),
			path: Some(PathBuf::from("/home/u/.config/tabcast/config.json")),
		};
		let mut buf = Vec::new();
		render_text(&loaded, &mut buf).unwrap();
		let text = String::from_utf8(buf).unwrap();

		assert!(text.starts_with("# /home/u/.config/tabcast/config.json\n"));
		assert!(text.contains("\"relayUrl\": \"ws://127.0.0.1:19988/stream\""));
	}

	#[test]
	fn text_marks_defaults() {
		let loaded = LoadedConfig {
			config: PanelConfig::default(),
			path: None,
		};
		let mut buf = Vec::new();
		render_text(&loaded, &mut buf).unwrap();
		assert!(String::from_utf8(buf).unwrap().starts_with("# built-in defaults\n"));
	}
}
