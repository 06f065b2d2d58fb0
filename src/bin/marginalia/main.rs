//! marginalia: command-line front-end for the reading-notes sync layer.
//! Every read goes through the shared query cache; every write goes through
//! the mutation path so dependent reads are invalidated.
#![deny(clippy::all, clippy::pedantic)]

mod context;
mod handlers;
mod print;

use std::process::ExitCode;

use marginalia::application::error::{AppError, ErrorReport};
use marginalia::config::{self, Command};
use marginalia::infra::telemetry;

use context::Ctx;
use handlers::{books, browse, notes, tags};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let report = ErrorReport::from_error("marginalia", &err);
            eprintln!("error: {}", report.render());
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run() -> Result<(), AppError> {
    let (cli, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;
    let ctx = Ctx::new(settings)?;

    match cli.command {
        Command::Books(cmd) => books::handle(&ctx, cmd).await?,
        Command::Notes(cmd) => notes::handle(&ctx, cmd).await?,
        Command::Tags(cmd) => tags::handle(&ctx, cmd).await?,
        Command::Browse(args) => browse::handle(&ctx, args).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
