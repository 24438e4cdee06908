//! Smellcheck CLI entry point.

use clap::Parser;
use smellcheck::cli::{self, Cli, Commands, EXIT_ERROR};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli::init_tracing(cli.global.verbose);

    let result = match &cli.command {
        Commands::Analyze(args) => cli::run_analyze(&cli.global, args).await,
        Commands::Health => cli::run_health(&cli.global).await,
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
