use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tabcast::{PanelConfig, Source, SourceFilter, ViewEntry, ViewOptions, filtered_view, source_count_label};

use crate::cli::ViewArgs;
use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewReport {
	pub filter: SourceFilter,
	pub show_all: bool,
	pub count_label: String,
	pub entries: Vec<ViewEntry>,
}

pub fn load_catalog(path: &Path) -> Result<Vec<Source>> {
	let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
		path: path.to_path_buf(),
		source,
	})?;
	serde_json::from_str(&raw).map_err(|source| CliError::Catalog {
		path: path.to_path_buf(),
		source,
	})
}

pub fn build_report(catalog: &[Source], args: &ViewArgs, config: &PanelConfig) -> ViewReport {
	let show_all = args.show_all || config.show_all_sources;
	let entries = filtered_view(
		catalog,
		&ViewOptions {
			filter: args.filter,
			show_all,
			allow_domains: &config.audio_source_domains,
			selection: args.selected,
			bound: args.bound,
		},
	);
	ViewReport {
		filter: args.filter,
		show_all,
		count_label: source_count_label(entries.len()),
		entries,
	}
}

pub(super) fn execute(args: &ViewArgs, config: &PanelConfig, format: OutputFormat) -> Result<()> {
	let catalog = load_catalog(&args.catalog)?;
	tracing::debug!(sources = catalog.len(), path = %args.catalog.display(), "catalog loaded");
	let report = build_report(&catalog, args, config);
	output::print_success("view", &report, format, render_text)?;
	Ok(())
}

fn render_text(report: &ViewReport, out: &mut dyn Write) -> io::Result<()> {
	for entry in &report.entries {
		let marker = if entry.selected { "*" } else { " " };
		let mut line = format!("{marker} {:>6}  {}", entry.id, entry.title);
		if entry.audible {
			line.push_str(" [audio]");
		}
		let url = entry.url.as_deref().unwrap_or("");
		if entry.disabled {
			writeln!(out, "{}  {}", line.dimmed(), url.dimmed())?;
		} else if entry.selected {
			writeln!(out, "{}  {}", line.bold(), url.dimmed())?;
		} else {
			writeln!(out, "{line}  {}", url.dimmed())?;
		}
	}
	writeln!(out, "{}", report.count_label)
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use tabcast::SourceId;
	use tempfile::TempDir;

	use super::*;

	fn args(filter: SourceFilter, show_all: bool) -> ViewArgs {
		ViewArgs {
			catalog: PathBuf::from("unused.json"),
			filter,
			show_all,
			selected: None,
			bound: None,
		}
	}

	fn catalog() -> Vec<Source> {
		vec![
			Source::new(1, "Docs").with_url("https://docs.rs/tokio"),
			Source::new(2, "Mix").with_url("https://soundcloud.com/mix").audible(true),
			Source::new(3, "Video").with_url("https://www.youtube.com/watch?v=1"),
			Source::new(4, "Call").with_url("https://meet.example/room").audible(true),
		]
	}

	#[test]
	fn default_view_hides_unlisted_silent_sources() {
		let report = build_report(&catalog(), &args(SourceFilter::All, false), &PanelConfig::default());
		let ids: Vec<i32> = report.entries.iter().map(|e| e.id.0).collect();
		assert_eq!(ids, vec![2, 3, 4]);
		assert_eq!(report.count_label, "3 sources");
	}

	#[test]
	fn config_can_show_everything() {
		let config = PanelConfig {
			show_all_sources: true,
			..PanelConfig::default()
		};
		let report = build_report(&catalog(), &args(SourceFilter::WithoutAudio, false), &config);
		let ids: Vec<i32> = report.entries.iter().map(|e| e.id.0).collect();
		assert_eq!(ids, vec![1, 3]);
		assert!(report.show_all);
	}

	#[test]
	fn bound_source_disables_the_rest() {
		let mut view_args = args(SourceFilter::WithAudio, true);
		view_args.selected = Some(SourceId(2));
		view_args.bound = Some(SourceId(2));

		let report = build_report(&catalog(), &view_args, &PanelConfig::default());
		let flags: Vec<(i32, bool, bool)> = report
			.entries
			.iter()
			.map(|e| (e.id.0, e.selected, e.disabled))
			.collect();
		assert_eq!(flags, vec![(2, true, false), (4, false, true)]);
	}

	#[test]
	fn text_rendering_ends_with_count() {
		colored::control::set_override(false);
		let report = build_report(&catalog(), &args(SourceFilter::WithAudio, true), &PanelConfig::default());

		let mut buf = Vec::new();
		render_text(&report, &mut buf).unwrap();
		let text = String::from_utf8(buf).unwrap();

		assert!(text.contains("Mix [audio]"));
		assert!(text.lines().any(|line| line.starts_with("       2  Mix [audio]")), "{text}");
		assert!(text.contains("https://meet.example/room"));
		assert_eq!(text.lines().last(), Some("2 sources"));
	}

	#[test]
	fn load_catalog_reads_json_array() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("tabs.json");
		std::fs::write(
			&path,
			r#"[{"id": 9, "title": "", "url": "https://vimeo.com/1", "audible": false}]"#,
		)
		.unwrap();

		let sources = load_catalog(&path).unwrap();
		assert_eq!(sources.len(), 1);
		assert_eq!(sources[0].display_title(), "Untitled");
	}

	#[test]
	fn load_catalog_rejects_objects() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("tabs.json");
		std::fs::write(&path, r#"{"id": 9}"#).unwrap();

		assert!(matches!(load_catalog(&path), Err(CliError::Catalog { .. })));
		assert!(matches!(
			load_catalog(&tmp.path().join("missing.json")),
			Err(CliError::Read { .. })
		));
	}
}
