//! Fleetsub hub daemon library
//!
//! This module provides the components behind `fleetsub-hubd`:
//! - Configuration loading
//! - Resource snapshot and bucket catalog loading
//! - Scheduler driving reconciliation cycles
//! - Daemon lifecycle management

#![deny(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod daemon;
pub mod error;
pub mod scheduler;

pub use config::DaemonConfig;
pub use daemon::{shutdown_signal, Daemon};
pub use error::{DaemonError, DaemonResult};
pub use scheduler::{PassSummary, Scheduler};
