/// API credentials from environment variables
pub mod credentials;

/// Database configuration and connection management
pub mod database;

/// Server and extraction settings loading from config.toml
pub mod settings;

pub use settings::{AppConfig, ExtractionConfig, ServerConfig, load_config, load_default_config};
