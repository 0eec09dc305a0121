/// Database connection and table creation
pub mod database;

/// Application configuration loading from config.toml
pub mod settings;
