//! # reclass-store
//!
//! Object store backends.
//!
//! This crate provides:
//! - `CloudinaryStore`, the production `ObjectStore` over the Cloudinary
//!   Admin and Upload APIs
//! - Request signing for authenticated uploads and deletions
//! - `MockObjectStore` for tests (enable the `mock` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use reclass_store::CloudinaryStore;
//! use reclass_core::{ObjectStore, StorageCategory};
//!
//! let store = CloudinaryStore::from_env()?;
//! let found = store.exists("res-management/report", StorageCategory::Document).await?;
//! ```

pub mod cloudinary;
pub mod config;
pub mod signing;

#[cfg(feature = "mock")]
pub mod mock;

pub use cloudinary::CloudinaryStore;
pub use config::StoreConfig;

#[cfg(feature = "mock")]
pub use mock::{MockCall, MockObjectStore, MockOp};
