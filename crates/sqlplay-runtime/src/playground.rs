use sqlplay_engine::{EngineSession, Storage};
use sqlplay_types::{Dialect, FileName, PlaygroundFileTree};
use std::path::Path;
use tracing::{debug, warn};

use crate::runner::{self, OutputSink, RunOutcome, RunStream};
use crate::toolkit::Toolkit;
use crate::{Error, Result};

/// A dialect plus the files to run against it.
#[derive(Debug, Clone, PartialEq)]
pub struct Playground {
    pub dialect: Dialect,
    pub files: PlaygroundFileTree,
}

impl Playground {
    pub fn new(dialect: Dialect, files: PlaygroundFileTree) -> Self {
        Self { dialect, files }
    }

    /// Core files for `dialect`, or a preset's files on top of them.
    pub fn from_registry(dialect: &str, preset: Option<&str>) -> Result<Self> {
        let files = sqlplay_registry::resolve_file_tree(dialect, preset)?;
        let dialect = dialect
            .parse::<Dialect>()
            .map_err(|_| sqlplay_registry::Error::UnknownDialect(dialect.to_string()))?;
        Ok(Self::new(dialect, files))
    }

    /// Replaces files with user edits. `tools` cannot be overridden.
    pub fn with_overrides(mut self, overrides: &PlaygroundFileTree) -> Self {
        self.files = self.files.overlay(overrides);
        self
    }

    /// Provisions an engine with this playground's schema.
    pub fn start(&self, storage: Storage) -> Result<EngineSession> {
        let schema = self
            .files
            .get(FileName::Schema)
            .ok_or(Error::MissingFile(FileName::Schema))?;
        Ok(EngineSession::from_source(self.dialect, schema, storage)?)
    }

    /// Provisions a fresh in-memory engine and runs the playground on it.
    pub fn run<S>(&self, toolkit: &Toolkit, sink: &mut S) -> Result<RunOutcome>
    where
        S: OutputSink + ?Sized,
    {
        let mut session = self.start(Storage::InMemory)?;
        Ok(runner::run(&mut session, &self.files, toolkit, sink))
    }

    /// Like [`Playground::run`], on a worker thread.
    pub fn spawn(&self, toolkit: Toolkit) -> Result<RunStream> {
        let session = self.start(Storage::InMemory)?;
        runner::spawn(session, self.files.clone(), toolkit)
    }
}

/// Reads `*.play` files from `dir` as overrides.
///
/// Unrecognised files and the toolkit reference are ignored.
pub fn read_overrides(dir: &Path) -> Result<PlaygroundFileTree> {
    let mut tree = PlaygroundFileTree::default();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("play") {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        match file_name.parse::<FileName>() {
            Ok(FileName::Tools) => debug!(path = %path.display(), "ignoring toolkit reference"),
            Ok(name) => {
                tree.set(name, std::fs::read_to_string(&path)?);
                debug!(file = %name, path = %path.display(), "loaded override");
            }
            Err(_) => warn!(path = %path.display(), "ignoring unknown playground file"),
        }
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_overrides() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("seed.play"), "select 1;").unwrap();
        std::fs::write(temp_dir.path().join("_tools.play"), "-- mine").unwrap();
        std::fs::write(temp_dir.path().join("notes.play"), "ignored").unwrap();
        std::fs::write(temp_dir.path().join("index.sql"), "ignored").unwrap();

        let tree = read_overrides(temp_dir.path()).unwrap();
        assert_eq!(tree, PlaygroundFileTree::default().with(FileName::Seed, "select 1;"));
    }

    #[test]
    fn test_overrides_keep_core_tools() {
        let overrides = PlaygroundFileTree::default()
            .with(FileName::Index, "log 'hi';")
            .with(FileName::Tools, "-- mine");
        let playground = Playground::from_registry("sqlite", None)
            .unwrap()
            .with_overrides(&overrides);

        assert_eq!(playground.files.get(FileName::Index), Some("log 'hi';"));
        assert_eq!(
            playground.files.get(FileName::Tools),
            Some(sqlplay_registry::tools_source())
        );
    }

    #[test]
    fn test_start_requires_schema() {
        let playground = Playground::new(
            Dialect::Sqlite,
            PlaygroundFileTree::default().with(FileName::Index, "select 1;"),
        );
        assert!(matches!(
            playground.start(Storage::InMemory),
            Err(Error::MissingFile(FileName::Schema))
        ));
    }
}
