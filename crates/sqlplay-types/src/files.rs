use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Canonical playground file names.
///
/// The set is closed: a playground never has files outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileName {
    Schema,
    Utils,
    Seed,
    Index,
    /// Read-only toolkit reference, always supplied by the core.
    Tools,
}

impl FileName {
    pub const ALL: [FileName; 5] = [
        FileName::Schema,
        FileName::Utils,
        FileName::Seed,
        FileName::Index,
        FileName::Tools,
    ];

    /// Script files in the order the execution unit runs them.
    /// `schema` is applied at session creation and is not part of a run.
    pub const RUN_ORDER: [FileName; 3] = [FileName::Utils, FileName::Seed, FileName::Index];

    /// Files a user (or preset) may override.
    pub const EDITABLE: [FileName; 4] = [
        FileName::Schema,
        FileName::Utils,
        FileName::Seed,
        FileName::Index,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileName::Schema => "schema",
            FileName::Utils => "utils",
            FileName::Seed => "seed",
            FileName::Index => "index",
            FileName::Tools => "tools",
        }
    }

    /// File name on disk (editor side, CLI `--dir`).
    pub fn file_name(&self) -> &'static str {
        match self {
            FileName::Schema => "schema.play",
            FileName::Utils => "utils.play",
            FileName::Seed => "seed.play",
            FileName::Index => "index.play",
            FileName::Tools => "_tools.play",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, FileName::Schema | FileName::Index)
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileName::ALL
            .into_iter()
            .find(|name| name.as_str() == s || name.file_name() == s)
            .ok_or_else(|| Error::UnknownFile(s.to_string()))
    }
}

/// Source text of one playground, keyed by canonical file name.
///
/// Absent files are `None`, never an empty string, so callers can tell
/// "omitted" from "empty".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaygroundFileTree {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utils: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<String>,
}

impl PlaygroundFileTree {
    pub fn get(&self, name: FileName) -> Option<&str> {
        self.slot(name).as_deref()
    }

    pub fn set(&mut self, name: FileName, source: impl Into<String>) {
        *self.slot_mut(name) = Some(source.into());
    }

    pub fn remove(&mut self, name: FileName) -> Option<String> {
        self.slot_mut(name).take()
    }

    pub fn with(mut self, name: FileName, source: impl Into<String>) -> Self {
        self.set(name, source);
        self
    }

    pub fn without(mut self, name: FileName) -> Self {
        self.remove(name);
        self
    }

    /// Present files in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (FileName, &str)> {
        FileName::ALL
            .into_iter()
            .filter_map(|name| self.get(name).map(|source| (name, source)))
    }

    /// Applies user overrides on top of this tree.
    ///
    /// Only editable files are taken from `overrides`; `tools` always stays
    /// with the core.
    pub fn overlay(mut self, overrides: &PlaygroundFileTree) -> Self {
        for name in FileName::EDITABLE {
            if let Some(source) = overrides.get(name) {
                self.set(name, source);
            }
        }
        self
    }

    /// Required files that are missing.
    pub fn missing_required(&self) -> Vec<FileName> {
        FileName::ALL
            .into_iter()
            .filter(|name| name.is_required() && self.get(*name).is_none())
            .collect()
    }

    fn slot(&self, name: FileName) -> &Option<String> {
        match name {
            FileName::Schema => &self.schema,
            FileName::Utils => &self.utils,
            FileName::Seed => &self.seed,
            FileName::Index => &self.index,
            FileName::Tools => &self.tools,
        }
    }

    fn slot_mut(&mut self, name: FileName) -> &mut Option<String> {
        match name {
            FileName::Schema => &mut self.schema,
            FileName::Utils => &mut self.utils,
            FileName::Seed => &mut self.seed,
            FileName::Index => &mut self.index,
            FileName::Tools => &mut self.tools,
        }
    }
}
