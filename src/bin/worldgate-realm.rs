#![warn(clippy::all)]
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

use worldgate::config::read_configuration;
use worldgate::{realmserver, Result};

#[derive(Parser)]
#[clap(version = "0.1.0", author = "Worldgate <worldgate@protonmail.com>")]
struct Opts {
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    config: PathBuf,
}

#[async_std::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        error!("Error while executing program: {:?}", e);
        process::exit(1);
    }
}

fn init_logging() {
    let fmt_layer = Layer::builder().with_target(true).finish();
    let filter_layer = EnvFilter::from_default_env();
    let subscriber = Registry::default().with(filter_layer).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).unwrap();
}

async fn run() -> Result<()> {
    let opts: Opts = Opts::parse();

    info!("Reading configuration file");
    let config = match read_configuration(&opts.config) {
        Ok(c) => c,
        Err(e) => {
            error!(
                "Can't read configuration file {}: {:?}",
                &opts.config.display(),
                e
            );
            return Err(e);
        }
    };

    info!("Starting the realm server");
    realmserver::run(config).await
}
