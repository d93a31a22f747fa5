//! tareas: a minimal to-do REST service and its synchronizing client.
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod server;
pub mod types;
