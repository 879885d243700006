use anyhow::{Context, Result};
use clap::Parser;
use dayplan::cli::{Cli, Command};
use dayplan::commands::{self, Session};
use dayplan::config::Config;
use dayplan::logging;

fn main() -> Result<()> {
    let args = Cli::parse();
    let config = Config::load(args.config.as_deref())?;
    let layout = config.layout(args.data_dir.as_deref())?;
    let _logger = logging::init_logging(&config.log_level, &layout.log_dir())
        .context("initializing logging")?;
    let session = Session::open(config, layout, args.date.as_deref())?;
    let command = args.command.unwrap_or(Command::Tui);
    commands::run(command, session)
}
