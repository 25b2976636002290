use serde::{Deserialize, Serialize};

/// Named starter file-set for a dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetManifest {
    pub id: String,
    pub name: String,
    pub description: String,
}
