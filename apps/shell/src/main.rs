#![allow(clippy::print_stdout)]

use anvil_logger::Logger;
use anvil_shell::args::Cli;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logger = init_logger(&cli)?;

    let summary = anvil_shell::run(&cli)?;
    print!("{summary}");

    if !summary.succeeded() {
        anyhow::bail!("Activation did not complete cleanly");
    }
    Ok(())
}

fn init_logger(cli: &Cli) -> anyhow::Result<Logger> {
    let builder = Logger::builder().name(env!("CARGO_BIN_NAME")).verbosity(cli.verbose);
    let logger = match &cli.log_dir {
        Some(dir) => builder.path(dir).init()?,
        None => builder.init()?,
    };
    Ok(logger)
}
