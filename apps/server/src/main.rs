#![warn(clippy::all, clippy::pedantic)]

use std::net::{IpAddr, SocketAddr};

use actix_web::{App, HttpServer, web};
use clap::Parser;
use tracing::{info, warn};

mod cli;
mod config;
mod cors;
mod error;
mod routes;
mod state;

use cli::Cli;
use config::{Config, ConfigError};
use error::AppError;
use logger::init_tracing;
use state::AppState;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if cli.print_config {
        println!("{config}");
        return Ok(());
    }

    let addr = SocketAddr::new(config.server.bind.parse::<IpAddr>()?, config.server.port);
    run_server(addr, AppState::from_config(&config.probe), config.server.allowed_origins).await
}

fn load_config(cli: &Cli) -> Result<Config, AppError> {
    let mut config = match Config::from_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(ConfigError::ConfigPathUnavailable) => {
            warn!("No config directory available, using defaults");
            Config::default()
        }
        Err(error) => return Err(error.into()),
    };

    config.apply_env()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    Ok(config)
}

async fn run_server(
    addr: SocketAddr,
    state: AppState,
    allowed_origins: Vec<String>,
) -> Result<(), AppError> {
    let state = web::Data::new(state);
    info!(%addr, origins = ?allowed_origins, "Starting netprobe server");

    HttpServer::new(move || {
        App::new()
            .wrap(cors::cors(&allowed_origins))
            .app_data(state.clone())
            .configure(routes::routes)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
