use clap::{CommandFactory, Parser};

use mdmhook::cli::Cli;
use mdmhook::error::RelayError;
use mdmhook::{config, server, telemetry};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    telemetry::init_tracing(cli.verbose, cli.log_format);

    if let Err(err) = run(&cli).await {
        let code = err.exit_code();
        if err.shows_usage() {
            eprintln!("{}", Cli::command().render_help());
        }
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: &Cli) -> Result<(), RelayError> {
    let config = config::resolve(cli)?;
    server::serve(config).await
}
