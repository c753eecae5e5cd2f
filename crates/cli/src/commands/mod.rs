//! CLI subcommand implementations.

pub mod catalog;
pub mod token;
pub mod webhook;
