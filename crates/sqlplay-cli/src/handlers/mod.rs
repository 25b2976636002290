pub mod files;
pub mod presets;
pub mod run;
pub mod store;

use crate::types::OutputFormat;
use is_terminal::IsTerminal;
use sqlplay_runtime::Config;
use std::path::PathBuf;

/// Resolved global state every handler needs.
pub struct HandlerContext {
    pub data_dir: PathBuf,
    pub config: Config,
    pub format: OutputFormat,
}

impl HandlerContext {
    pub fn storage_dir(&self) -> PathBuf {
        self.config.storage_dir_in(&self.data_dir)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Colors only for plain output on a terminal.
    pub fn color(&self) -> bool {
        !self.is_json() && std::io::stdout().is_terminal()
    }
}
