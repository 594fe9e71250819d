//! # Furnish Library
//!
//! This library exposes the Furnish server and CLI modules for testing and
//! integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;

// Re-export furnish_core for convenience
pub use furnish_core;
