use clap::Parser;
use std::process::ExitCode;
use uvstrap::cli::Cli;
use uvstrap::{commands, ui};

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();
    ui::set_verbose(cli.verbose);

    // Initialize tracing
    let default_filter = if cli.verbose {
        "uvstrap=debug"
    } else {
        "uvstrap=warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    match commands::execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::critical(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
