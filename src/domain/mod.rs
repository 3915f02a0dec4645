// Domain module - Shared types and errors
pub mod config;
pub mod error;
pub mod options;
