use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mongo_rest::prelude::*;

/// mongo-rest-server - expose MongoDB collections as REST endpoints
#[derive(Parser, Debug)]
#[command(name = "mongo-rest-server")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard search path
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };
    if let Some(port) = cli.port {
        config.service.port = port;
    }

    init_tracing(&config)?;

    let store = MongoStore::connect(&config.mongo)
        .await
        .context("failed to connect to MongoDB")?;

    let rest = RestConfig::from_settings(store, &config.rest);
    tracing::info!(
        prefix = %config.rest.prefix,
        response_field = ?config.rest.response_field,
        autoincrement = config.rest.autoincrement,
        database = %config.mongo.database,
        "Mounting collection routes"
    );
    let app = rest_router(rest, &config.rest.prefix);

    Server::new(config).serve(app).await?;

    Ok(())
}
