use std::process;

use anyhow::Result;
use clap::Parser;
use model_skill::cli::{run, Cli};
use model_skill::logging;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = try_main(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn try_main(cli: Cli) -> Result<()> {
    run(cli)?;
    Ok(())
}
