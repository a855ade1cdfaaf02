mod check;
mod config;
mod view;

use crate::cli::{Cli, Commands};
use crate::config_store::LoadedConfig;
use crate::error::{CliError, Result};
use crate::relay::{self, RelayOptions};

pub use check::{AddressReport, classify};
pub use view::{ViewReport, build_report, load_catalog};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let Cli {
		config,
		format,
		command,
		..
	} = cli;

	match command {
		Commands::Relay(args) => relay::run_relay_server(RelayOptions {
			host: args.host,
			port: args.port,
			record_dir: args.record_dir,
		})
		.await
		.map_err(CliError::Relay),
		Commands::View(args) => {
			let loaded = LoadedConfig::load(config.as_deref())?;
			view::execute(&args, &loaded.config, format)
		}
		Commands::Check(args) => {
			let loaded = LoadedConfig::load(config.as_deref())?;
			check::execute(&args, &loaded.config, format)
		}
		Commands::Config => {
			let loaded = LoadedConfig::load(config.as_deref())?;
			config::execute(&loaded, format)
		}
	}
}
