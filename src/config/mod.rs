/// Database configuration and connection management
pub mod database;

/// Template catalog loading and seeding from config.toml
pub mod catalog;
