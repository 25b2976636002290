// Dialect registry
// Core files and presets are compiled into the binary and looked up by
// (dialect, file name); nothing is read from disk at runtime.

mod catalog;
pub mod error;

pub use error::{Error, Result};

use sqlplay_types::{Dialect, PlaygroundFileTree, PresetManifest};
use tracing::{debug, warn};

use catalog::{CATALOG, DialectTemplates};

/// Dialects that have templates, in catalog order.
pub fn dialects() -> Vec<Dialect> {
    CATALOG.keys().copied().collect()
}

/// Presets available for `dialect`.
pub fn list_presets(dialect: &str) -> Result<Vec<PresetManifest>> {
    let templates = lookup(dialect)?;
    Ok(templates.presets.iter().map(|p| p.manifest()).collect())
}

/// Builds the file tree for a new playground.
///
/// Without a preset this is the dialect's core tree. With one, the preset's
/// files replace the core files it defines; `schema` and `index` fall back to
/// core, while `utils` and `seed` stay absent unless the preset provides
/// them.
pub fn resolve_file_tree(dialect: &str, preset: Option<&str>) -> Result<PlaygroundFileTree> {
    let templates = lookup(dialect)?;
    let core = templates.core_tree();

    let Some(preset_id) = preset else {
        return Ok(core);
    };

    let preset = templates
        .preset(preset_id)
        .ok_or_else(|| Error::PresetNotFound {
            dialect: dialect.to_string(),
            preset: preset_id.to_string(),
        })?;

    debug!(dialect, preset = preset.id, "resolved preset");
    Ok(core.overlay(&catalog::preset_tree(preset)))
}

/// Like [`resolve_file_tree`], but an unknown preset degrades to the core
/// tree. Unknown dialects are still an error.
pub fn resolve_file_tree_or_core(dialect: &str, preset: Option<&str>) -> Result<PlaygroundFileTree> {
    match resolve_file_tree(dialect, preset) {
        Err(Error::PresetNotFound { preset, .. }) => {
            warn!(dialect, preset = %preset, "preset not found, using core files");
            resolve_file_tree(dialect, None)
        }
        other => other,
    }
}

/// The read-only toolkit reference shipped with every playground.
pub fn tools_source() -> &'static str {
    catalog::TOOLS
}

fn lookup(dialect: &str) -> Result<&'static DialectTemplates> {
    let parsed: Dialect = dialect
        .parse()
        .map_err(|_| Error::UnknownDialect(dialect.to_string()))?;
    CATALOG
        .get(&parsed)
        .ok_or_else(|| Error::UnknownDialect(dialect.to_string()))
}
