//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheBackend, CacheSettings, DatabaseConfig, LogFormat, LoggingConfig,
    ServerConfig, StoreBackend,
};
