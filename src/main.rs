use std::process::ExitCode;

use clap::Parser;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            cli::report(e);
            ExitCode::FAILURE
        }
    }
}
