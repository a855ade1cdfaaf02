#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tabcast::{SourceFilter, SourceId};

use crate::output::OutputFormat;
use crate::relay::{DEFAULT_HOST, DEFAULT_PORT};

/// Root CLI for tabcast.
#[derive(Parser, Debug)]
#[command(name = "tabcast")]
#[command(about = "Relay endpoint and tooling for the tabcast capture panel")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Config file (default: $XDG_CONFIG_HOME/tabcast/config.json)
	#[arg(long, global = true, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run the WebSocket endpoint the panel streams into.
	Relay(RelayArgs),
	/// Print the filtered source list for a JSON catalog.
	View(ViewArgs),
	/// Report capture policy for one or more addresses.
	Check(CheckArgs),
	/// Print the effective configuration.
	Config,
}

#[derive(Args, Debug, Clone)]
pub struct RelayArgs {
	#[arg(long, default_value = DEFAULT_HOST)]
	pub host: String,

	#[arg(long, default_value_t = DEFAULT_PORT)]
	pub port: u16,

	/// Write each stream's media chunks to a file in this directory.
	#[arg(long, value_name = "DIR")]
	pub record_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
	/// JSON array of sources.
	#[arg(long, value_name = "FILE")]
	pub catalog: PathBuf,

	/// all, with-audio, or without-audio
	#[arg(long, default_value = "all")]
	pub filter: SourceFilter,

	/// Include sources outside the audio allow-list.
	#[arg(long)]
	pub show_all: bool,

	#[arg(long, value_name = "ID")]
	pub selected: Option<SourceId>,

	/// Source bound to an active stream; other entries render disabled.
	#[arg(long, value_name = "ID")]
	pub bound: Option<SourceId>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
	#[arg(value_name = "URL", required = true)]
	pub urls: Vec<String>,
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Relay(_) => "relay",
			Commands::View(_) => "view",
			Commands::Check(_) => "check",
			Commands::Config => "config",
		}
	}
}
