use clap::Parser;
use log::LevelFilter;

mod commands;
mod config;
mod device;
mod logging;

use commands::ZuneSubcommand;
use config::HostConfig;

#[derive(Parser, Debug, Clone)]
#[clap(name = "zune-host", version, author)]
#[clap(about = "Drives MTP authoring and the USB network bridge for a connected device")]
pub struct ZuneArguments {
    #[clap(subcommand)]
    subcommand: ZuneSubcommand,
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_env("ZUNE_LOG")
        .format(logging::formatter)
        .init();

    let args = ZuneArguments::parse();
    log::debug!("{:#?}", args);

    let config = HostConfig::load()?;
    commands::run(args.subcommand, &config)
}
