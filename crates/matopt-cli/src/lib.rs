//! Shared utilities for matopt-cli
//!
//! Argument parsing helpers reused across the command implementations.

pub mod commands;
pub mod parsers;

pub use parsers::{parse_swatch_size, parse_target_format, parse_uv};
