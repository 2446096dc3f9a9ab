use clap::Parser;
use miette::Result;
use spritesass::cli::{Cli, Commands};
use spritesass::output::Printer;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    let printer = Printer::new();
    match cli.command {
        Commands::Build(args) => spritesass::cli::build::run(args, &printer)?,
        Commands::Deps(args) => spritesass::cli::deps::run(args, &printer)?,
        Commands::Watch(args) => spritesass::cli::watch::run(args, &printer)?,
    }

    Ok(())
}
