use std::io::{self, Write};

use colored::Colorize;
use serde::Serialize;
use tabcast::PanelConfig;
use tabcast::guard::{is_allow_listed, is_restricted};

use crate::cli::CheckArgs;
use crate::error::Result;
use crate::output::{self, OutputFormat};

/// Capture policy for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressReport {
	pub url: String,
	/// On the host security denylist; capture is always refused.
	pub restricted: bool,
	/// Listed even when silent and "show all" is off.
	pub allow_listed: bool,
}

pub fn classify(urls: &[String], config: &PanelConfig) -> Vec<AddressReport> {
	urls.iter()
		.map(|url| AddressReport {
			url: url.clone(),
			restricted: is_restricted(url, &config.restricted_prefixes),
			allow_listed: is_allow_listed(url, &config.audio_source_domains),
		})
		.collect()
}

pub(super) fn execute(args: &CheckArgs, config: &PanelConfig, format: OutputFormat) -> Result<()> {
	let reports = classify(&args.urls, config);
	output::print_success("check", &reports, format, render_text)?;
	Ok(())
}

fn render_text(reports: &Vec<AddressReport>, out: &mut dyn Write) -> io::Result<()> {
	for report in reports {
		let verdict = if report.restricted {
			"restricted".red().to_string()
		} else if report.allow_listed {
			"capturable, audio allow-listed".green().to_string()
		} else {
			"capturable".to_string()
		};
		writeln!(out, "{}  {verdict}", report.url)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn urls(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn classifies_against_default_policy() {
		let reports = classify(
			&urls(&[
				"chrome://extensions",
				"about:blank",
				"https://music.youtube.com/watch?v=1",
				"https://example.com/",
			]),
			&PanelConfig::default(),
		);

		let flags: Vec<(bool, bool)> = reports.iter().map(|r| (r.restricted, r.allow_listed)).collect();
		assert_eq!(
			flags,
			vec![(true, false), (true, false), (false, true), (false, false)]
		);
	}

	#[test]
	fn custom_prefixes_apply() {
		let config = PanelConfig {
			restricted_prefixes: vec!["file://".to_string()],
			..PanelConfig::default()
		};
		let reports = classify(&urls(&["file:///etc/hosts", "chrome://settings"]), &config);
		assert!(reports[0].restricted);
		assert!(!reports[1].restricted);
	}

	#[test]
	fn text_output_names_the_verdict() {
		colored::control::set_override(false);
		let reports = classify(&urls(&["edge://flags", "https://vimeo.com/2"]), &PanelConfig::default());

		let mut buf = Vec::new();
		render_text(&reports, &mut buf).unwrap();
		let text = String::from_utf8(buf).unwrap();

		assert_eq!(
			text,
			"edge://flags  restricted\nhttps://vimeo.com/2  capturable, audio allow-listed\n"
		);
	}
}
