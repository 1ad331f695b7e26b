//! Command-line interface for diagscope
//!
//! This module contains CLI argument parsing and configuration

pub mod args;

pub use args::{parse_hex_address, Args};
