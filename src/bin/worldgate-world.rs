#![warn(clippy::all)]
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use async_std::task;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

use worldgate::config::read_configuration;
use worldgate::message::{world_queue, ConnectionRegistry};
use worldgate::protocol::WorldContext;
use worldgate::worldhandler::WorldHandler;
use worldgate::{worldserver, DbPool, Result};

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

    info!("Connecting to the database");
    let pool = DbPool::builder()
        .build(&config.database.connection_string())
        .await?;

    let (bus, queue) = world_queue();
    let context = Arc::new(WorldContext {
        pool,
        bus,
        registry: ConnectionRegistry::new(),
    });

    info!("Starting the world handler");
    task::spawn(async move {
        let mut handler = WorldHandler::new(queue);
        if let Err(e) = handler.run().await {
            error!("World handler stopped: {:?}", e);
        }
    });

    info!("Starting the world server");
    worldserver::run(context, config).await
}
