// Infrastructure module - Persisted stores and logging
pub mod config;
pub mod logging;
