//! Core types: errors, configuration, clock, shared path helpers.

pub mod clock;
pub mod config;
pub mod errors;
pub mod paths;
