//! TestWorld pattern for declarative integration test setup.

use anyhow::Result;
use assert_cmd::Command;
use sqlplay_types::FileName;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated environment: a temp root holding the data directory and any
/// playground file directories a test writes.
///
/// # Example
/// ```no_run
/// use sqlplay_testing::TestWorld;
///
/// let world = TestWorld::new();
/// let result = world.run(&["presets", "sqlite"]).unwrap();
/// assert!(result.success());
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    data_dir: PathBuf,
    env_vars: HashMap<String, String>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join(".sqlplay");
        std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");

        Self {
            temp_dir,
            data_dir,
            env_vars: HashMap::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Where persisted images live with the default configuration.
    pub fn storage_dir(&self) -> PathBuf {
        let dir = self.data_dir.join("images");
        std::fs::create_dir_all(&dir).expect("Failed to create storage dir");
        dir
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Set an environment variable for CLI execution.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Writes `config.toml` into the data directory.
    pub fn with_config(self, content: &str) -> Self {
        std::fs::write(self.data_dir.join("config.toml"), content).expect("Failed to write config");
        self
    }

    /// Writes `*.play` files into `<temp>/<name>` and returns that directory.
    pub fn write_play_dir(&self, name: &str, files: &[(FileName, &str)]) -> PathBuf {
        let dir = self.temp_dir.path().join(name);
        std::fs::create_dir_all(&dir).expect("Failed to create play dir");
        for (file, source) in files {
            std::fs::write(dir.join(file.file_name()), source).expect("Failed to write play file");
        }
        dir
    }

    /// Configure a CLI command with this test environment's settings.
    ///
    /// The caller provides the base command, e.g. from `cargo_bin_cmd!("sqlplay")`.
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.arg("--data-dir").arg(self.data_dir());
        cmd.current_dir(self.temp_dir.path());
        cmd.env_remove("SQLPLAY_PATH").env_remove("RUST_LOG");

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        cmd
    }

    /// Runs the `sqlplay` binary with `args` and captures its output.
    #[allow(deprecated)]
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let mut cmd = Command::cargo_bin("sqlplay")
            .map_err(|e| anyhow::anyhow!("Failed to find sqlplay binary: {}", e))?;
        self.configure_command(&mut cmd);
        cmd.args(args);

        let output = cmd.output()?;
        Ok(CliResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Result of a CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Parses each stdout line as one JSON value.
    pub fn json_lines(&self) -> Result<Vec<serde_json::Value>> {
        self.stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Ok(serde_json::from_str(line)?))
            .collect()
    }
}
