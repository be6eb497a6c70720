//! # reclass-core
//!
//! Core types, traits, and abstractions for repairing attachments that were
//! stored under the wrong object-store category.
//!
//! This crate provides the data model, the error taxonomy and the collaborator
//! traits that the database, object store and engine crates depend on.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod policy;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{ConfigError, ConfigResult};
pub use error::{Error, Result};
pub use models::*;
pub use policy::MigrationPolicy;
pub use traits::*;
