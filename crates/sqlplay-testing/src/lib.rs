//! Testing infrastructure for sqlplay integration tests.
//!
//! - `TestWorld`: isolated data directory and CLI command setup
//! - `fixtures`: legacy persisted images in their old on-disk layouts

pub mod fixtures;
pub mod world;

pub use fixtures::LegacyPlayground;
pub use world::{CliResult, TestWorld};
