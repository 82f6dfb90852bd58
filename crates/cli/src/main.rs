mod cli;
mod commands;
mod tracing;

use crate::cli::Cli;
use crate::commands::Context;
use crate::tracing::TracingConfig;
use clap::Parser;

#[tokio::main]
#[allow(clippy::print_stdout)]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    crate::tracing::init_tracing(TracingConfig {
        format: cli.tracing_format(),
        level: cli.level.into(),
        ..Default::default()
    })?;

    let context = Context::from_cli(&cli);
    let output = commands::execute(&context, cli.command).await?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
