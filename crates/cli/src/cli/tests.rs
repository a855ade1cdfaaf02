use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_relay_defaults() {
	let cli = Cli::try_parse_from(["tabcast", "relay"]).unwrap();

	match cli.command {
		Commands::Relay(args) => {
			assert_eq!(args.host, "127.0.0.1");
			assert_eq!(args.port, 19988);
			assert_eq!(args.record_dir, None);
		}
		_ => panic!("Expected Relay command"),
	}
	assert_eq!(cli.verbose, 0);
	assert_eq!(cli.format, OutputFormat::Text);
}

#[test]
fn parse_relay_with_recording() {
	let cli = Cli::try_parse_from([
		"tabcast",
		"relay",
		"--host",
		"0.0.0.0",
		"--port",
		"9000",
		"--record-dir",
		"/tmp/streams",
	])
	.unwrap();

	match cli.command {
		Commands::Relay(args) => {
			assert_eq!(args.host, "0.0.0.0");
			assert_eq!(args.port, 9000);
			assert_eq!(args.record_dir, Some(PathBuf::from("/tmp/streams")));
		}
		_ => panic!("Expected Relay command"),
	}
}

#[test]
fn parse_view_command() {
	let cli = Cli::try_parse_from([
		"tabcast",
		"view",
		"--catalog",
		"tabs.json",
		"--filter",
		"with-audio",
		"--show-all",
		"--selected",
		"4",
		"--bound",
		"4",
	])
	.unwrap();

	match cli.command {
		Commands::View(args) => {
			assert_eq!(args.catalog, PathBuf::from("tabs.json"));
			assert_eq!(args.filter, SourceFilter::WithAudio);
			assert!(args.show_all);
			assert_eq!(args.selected, Some(SourceId(4)));
			assert_eq!(args.bound, Some(SourceId(4)));
		}
		_ => panic!("Expected View command"),
	}
}

#[test]
fn view_requires_catalog() {
	assert!(Cli::try_parse_from(["tabcast", "view"]).is_err());
}

#[test]
fn view_rejects_unknown_filter() {
	let result = Cli::try_parse_from(["tabcast", "view", "--catalog", "t.json", "--filter", "loud"]);
	assert!(result.is_err());
}

#[test]
fn parse_check_urls() {
	let cli = Cli::try_parse_from(["tabcast", "check", "chrome://settings", "https://example.com"])
		.unwrap();
	match cli.command {
		Commands::Check(args) => {
			assert_eq!(args.urls, vec!["chrome://settings", "https://example.com"]);
		}
		_ => panic!("Expected Check command"),
	}
}

#[test]
fn check_requires_a_url() {
	assert!(Cli::try_parse_from(["tabcast", "check"]).is_err());
}

#[test]
fn global_flags_after_subcommand() {
	let cli = Cli::try_parse_from(["tabcast", "config", "-vv", "-f", "json", "--config", "/etc/tabcast.json"])
		.unwrap();
	assert!(matches!(cli.command, Commands::Config));
	assert_eq!(cli.verbose, 2);
	assert_eq!(cli.format, OutputFormat::Json);
	assert_eq!(cli.config, Some(PathBuf::from("/etc/tabcast.json")));
	assert_eq!(cli.command.name(), "config");
}
