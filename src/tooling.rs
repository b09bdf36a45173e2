//! Tooling & Integration Layer
//!
//! CLI surface used by the `treecache` binary.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
