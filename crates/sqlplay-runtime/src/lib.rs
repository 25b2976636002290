// Playground execution
// Scripts run file by file against an engine session; every statement and
// console line comes out as one ordered stream of `OutputEvent`s.

pub mod config;
mod context;
pub mod error;
mod interpreter;
mod playground;
mod runner;
pub mod script;
pub mod toolkit;

pub use config::{Config, resolve_data_dir};
pub use context::ExecutionContext;
pub use error::{Error, Result};
pub use playground::{Playground, read_overrides};
pub use runner::{OutputSink, RunOutcome, RunStream, run, spawn};
pub use toolkit::{FUNCTIONS, Toolkit};
