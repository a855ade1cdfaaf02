use clap::Parser;
use tabcast_cli::{
	cli::{Cli, Commands},
	commands, logging, output,
};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	// The relay is long-running; show its lifecycle without -v.
	let verbosity = match cli.command {
		Commands::Relay(_) => cli.verbose.max(1),
		_ => cli.verbose,
	};
	logging::init_logging(verbosity);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli).await {
		output::print_failure(command, err.code(), &err.to_string(), format);
		std::process::exit(err.exit_code());
	}
}
