//! Core utilities for the model viewer.
//!
//! This crate provides foundational types used across the workspace:
//! - The immutable startup configuration
//! - Error types and result aliases
//! - Logging initialization
//! - Timer utilities

mod config;
mod error;
mod logging;
mod timer;

pub use config::{ClearColor, Config};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::Timer;
