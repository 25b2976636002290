use super::HandlerContext;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn handle(
    ctx: &HandlerContext,
    dialect: &str,
    preset: Option<&str>,
    out: Option<&Path>,
) -> Result<()> {
    let tree = sqlplay_registry::resolve_file_tree(dialect, preset)?;

    if let Some(dir) = out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for (name, source) in tree.iter() {
            std::fs::write(dir.join(name.file_name()), source)?;
        }
        println!("Wrote {} files to {}", tree.iter().count(), dir.display());
        return Ok(());
    }

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    for (name, source) in tree.iter() {
        let header = format!("== {} ==", name.file_name());
        if ctx.color() {
            println!("{}", header.bold());
        } else {
            println!("{}", header);
        }
        println!("{}", source.trim_end());
        println!();
    }

    Ok(())
}
