//! # reclass-engine
//!
//! Finds attachments stored under the wrong category and moves them.
//!
//! This crate provides:
//! - `Classifier`: decides per attachment whether it is misplaced
//! - `Migrator`: copies a misplaced object to the target category
//! - `Reconciler`: runs both over every record and writes back changes
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reclass_engine::{MigrationPolicy, Reconciler};
//!
//! let counters = Reconciler::new(Arc::new(store), Arc::new(db.records), MigrationPolicy::from_env()?)
//!     .dry_run(false)
//!     .run()
//!     .await?;
//! println!("{}", counters);
//! ```

pub mod classifier;
pub mod driver;
pub mod migrator;

// Re-export core types
pub use reclass_core::*;

pub use classifier::Classifier;
pub use driver::Reconciler;
pub use migrator::Migrator;
