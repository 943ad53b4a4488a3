//! Core library for the `weather` forecast service.
//!
//! This crate defines:
//! - The canonical forecast model and condition classifier
//! - Adapters for OpenWeatherMap and WeatherAPI
//! - Configuration & credentials handling
//! - The HTTP endpoint serving normalized forecasts
//! - The client-side weather store consumed by display widgets
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod server;
pub mod store;

pub use config::{Config, EnvSettings, ProviderConfig, ProviderSettings, SettingsSource};
pub use error::{ClientError, ForecastError};
pub use model::{Condition, Coordinates, ForecastDay, ForecastResponse, TempUnit, Units};
pub use provider::{ForecastProvider, ProviderEndpoints, ProviderId};
pub use server::{AppState, routes, serve};
pub use store::{
    FixedLocation, ForecastSource, Geolocator, HttpForecastSource, Phase, WeatherSnapshot,
    WeatherStore,
};
