use std::io::{self, BufWriter};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tl_cli::commands::{detect, parsers, scan};
use tl_cli::{Cli, Commands, Config};
use tl_core::Registry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Events own stdout; logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let registry = Registry::builtin()
        .and_then(|registry| registry.select(&config.parsers))
        .context("invalid `parsers` configuration")?;

    let mut stdout = io::stdout().lock();
    match &cli.command {
        Some(Commands::Parsers) => parsers::run(&mut stdout, &registry)?,
        Some(Commands::Detect { paths }) => detect::run(&mut stdout, &registry, paths)?,
        Some(Commands::Scan { paths, parser }) => {
            let options = scan::ScanOptions {
                parser: parser.as_deref(),
                year: config.year(),
                max_text_file_size: config.max_text_file_size,
            };
            let mut out = BufWriter::new(stdout);
            let failed = scan::run(&mut out, &mut io::stderr().lock(), &registry, paths, &options)?;
            if failed > 0 {
                anyhow::bail!("{failed} of {} files failed to scan", paths.len());
            }
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
