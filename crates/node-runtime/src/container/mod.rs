//! # Node Container
//!
//! Configuration, on-disk layout and the wiring of every collaborator.

pub mod config;
pub mod home;
pub mod subsystems;

pub use config::{Config, ConfigError};
pub use home::{HomeError, HomeLock, NodeHome};
pub use subsystems::{open_content_store, NodeContainer, NodeParts};
