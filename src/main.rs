use clap::Parser;
use tracing_subscriber::EnvFilter;

use carlot::config::Config;
use carlot::store::CarRegistry;
use carlot::{Server, app};

#[tokio::main]
async fn main() -> Result<(), carlot::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    tracing::info!(variant = ?config.variant, "starting");

    let app = app::build(&config, CarRegistry::new());
    Server::bind(config.bind_addr()).serve(app).await
}
