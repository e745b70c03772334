//! Command-line runner for mediaflow.
//!
//! Executes a single trigger event against the built-in plugins with an
//! in-memory run store, and prints the resulting run and steps as JSON.

pub mod config;
pub mod error;
pub mod run;
