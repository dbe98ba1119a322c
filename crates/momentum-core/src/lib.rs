//! Shared error type and configuration tree for the Momentum workspace.

pub mod config;
pub mod error;

pub use config::MomentumConfig;
pub use error::{MomentumError, Result};
