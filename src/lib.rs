//! Shroud Library
//!
//! Command interpretation for a code protection toolchain: argument schema,
//! options normalizer, context resolver, cross-field validator and command
//! dispatch to the build engine, configuration editor and license registrar.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::context::Context;
pub use crate::core::engine::{BuildEngine, ManifestEngine};
pub use domain::error::{ShroudError, ShroudResult};
pub use domain::options::{NormalizedOptions, OptionValue};
