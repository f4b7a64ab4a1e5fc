//! BANCA — bankroll tracking dashboard
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod clock;
pub mod calc;
pub mod view;
pub mod backend;
pub mod engine;
pub mod dashboard;
