use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use weather_core::{
    AppState, Config, Coordinates, EnvSettings, FixedLocation, HttpForecastSource, ProviderId,
    WeatherStore,
    provider::{DEFAULT_TIMEOUT, http_client},
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather forecast service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweathermap" or "weatherapi".
        provider: String,

        /// Make this provider the default even if another one is set.
        #[arg(long)]
        default: bool,
    },

    /// Run the forecast HTTP endpoint.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "WEATHER_ADDR", default_value = "127.0.0.1:3000")]
        addr: String,
    },

    /// Show the forecast for a location using a running endpoint.
    Show {
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,

        /// Forecast endpoint URL.
        #[arg(long, default_value = "http://127.0.0.1:3000/forecast")]
        endpoint: String,

        /// Locale used to pick Celsius or Fahrenheit, e.g. "en-US".
        #[arg(long, env = "LANG", default_value = "en")]
        locale: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider, default } => configure(&provider, default),
            Command::Serve { addr } => serve(&addr).await,
            Command::Show { lat, lon, endpoint, locale } => {
                let location = lat.zip(lon).map(|(lat, lon)| Coordinates { lat, lon });
                show(location, endpoint, &locale).await
            }
        }
    }
}

fn configure(provider: &str, make_default: bool) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = inquire::Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    config.upsert_provider_api_key(id, api_key.trim().to_string());
    if make_default {
        config.set_default_provider(id);
    }

    let path = config.save()?;
    println!("Saved {id} credentials to {}", path.display());
    Ok(())
}

async fn serve(addr: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let http = http_client(DEFAULT_TIMEOUT)?;
    let state = AppState::new(Arc::new(EnvSettings::new(config)), http);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    weather_core::serve(listener, state, shutdown_signal())
        .await
        .context("Forecast server stopped unexpectedly")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn show(location: Option<Coordinates>, endpoint: String, locale: &str) -> anyhow::Result<()> {
    let http = http_client(DEFAULT_TIMEOUT)?;
    let store = WeatherStore::new(
        Arc::new(FixedLocation(location)),
        Arc::new(HttpForecastSource::new(http, endpoint)),
        locale,
    );
    let mut widget = store.subscribe();

    store.mount().await;

    let snapshot = widget.borrow_and_update().clone();
    println!("{}", render::header_temperature(&snapshot));
    println!();
    for line in render::forecast_panel(&snapshot) {
        println!("{line}");
    }
    println!();
    println!("Updated {}", Local::now().format("%H:%M"));

    Ok(())
}
