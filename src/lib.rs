//! knot-harness - integration tests for the knot package linker
//!
//! The linker is treated as a black box: the harness generates workspaces,
//! invokes `knot` as a subprocess and asserts on what it leaves behind.

pub mod cli;
pub mod commands;
pub mod common;
pub mod testing;

pub use common::{Error, HarnessConfig, Result};
