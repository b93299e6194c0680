//! Imageforged - bulk image conversion service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod conversion;
pub mod retrieval;
pub mod server;
pub mod store;
