//! Imageforged-Common: Shared types, IDs, and utilities.
//!
//! This crate provides common functionality used across imageforged:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for batches, artifacts, and sessions
//! - **Upload Utilities**: The upload allow-list and filename sanitization
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use imageforged_common::{BatchId, Error, Result};
//! use imageforged_common::paths::is_allowed_upload;
//!
//! // Create typed IDs
//! let batch_id = BatchId::new();
//!
//! // Check uploads against the allow-list
//! assert!(is_allowed_upload("photo.png", "image/png"));
//!
//! // Use common error types
//! fn example() -> Result<()> {
//!     Err(Error::not_found("batch"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;

pub use error::{Error, Result};
pub use ids::*;
