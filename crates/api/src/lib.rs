//! # CarIndex App
//!
//! Application layer - commands and main entry point.
//!
//! This crate contains:
//! - Catalog commands (browse, sync, stats, maintenance)
//! - Application context (dependency injection)
//! - Logging setup and health reporting
//!
//! ## Architecture
//! - Depends on `domain`, `core` and `infra`
//! - Wires up the hexagonal architecture

pub mod commands;
pub mod context;
pub mod utils;

pub use context::AppContext;
