mod cli;
mod engine;
mod run;
mod script;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Record(args) => run::record(args),
        Command::Inspect(args) => run::inspect(args),
        Command::Warmup(args) => run::warmup(args),
    }
}
