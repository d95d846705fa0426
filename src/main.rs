use clap::Parser;

use courier::cli::{check, output, send, CheckCommand, Cli, Commands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check(CheckCommand::Config(args)) => check::execute_config(&args.config),
        Commands::Check(CheckCommand::Connection(args)) => {
            check::execute_connection(&args.config).await
        }
        Commands::Send(args) => send::execute(args).await,
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
