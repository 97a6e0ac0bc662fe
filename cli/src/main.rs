mod commands;
mod terminal;

use std::path::PathBuf;

use anyhow::Context;
use commands::{CommandLine, Commands, license, search};
use scli_common::config::{ConfigLoader, ConfigOverrides, DEFAULT_LOG_FILE};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    let mut loader = ConfigLoader::new().with_overrides(ConfigOverrides {
        endpoint: commands.endpoint.clone(),
    });
    if let Some(path) = &commands.config {
        loader = loader.with_config_path(path);
    }
    let cfg = loader.load();

    let log_file = cfg
        .as_ref()
        .map(|cfg| cfg.log_file.clone())
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE));
    logging::init_logging(commands.verbose, &log_file);

    let cfg = cfg.context("unable to load the configuration")?;

    match commands.command {
        Commands::License(args) => {
            print::header("getting ready for retrieval");
            license::license(args, &cfg).await
        }
        Commands::Search { serials } => {
            print::header("searching components");
            search::search(serials, &cfg).await
        }
    }
}
