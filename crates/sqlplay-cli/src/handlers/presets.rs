use super::HandlerContext;
use anyhow::Result;
use owo_colors::OwoColorize;

pub fn handle(ctx: &HandlerContext, dialect: &str) -> Result<()> {
    let presets = sqlplay_registry::list_presets(dialect)?;

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&presets)?);
        return Ok(());
    }

    if presets.is_empty() {
        println!("No presets for {}.", dialect);
        return Ok(());
    }

    println!("{:<12} {:<20} DESCRIPTION", "ID", "NAME");
    for preset in &presets {
        let id = format!("{:<12}", preset.id);
        if ctx.color() {
            print!("{}", id.cyan());
        } else {
            print!("{}", id);
        }
        println!(" {:<20} {}", preset.name, preset.description);
    }

    Ok(())
}
