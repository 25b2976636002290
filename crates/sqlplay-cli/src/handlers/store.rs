use super::HandlerContext;
use anyhow::{Result, anyhow};
use owo_colors::OwoColorize;
use sqlplay_runtime::{Playground, read_overrides};
use sqlplay_store::{Migrator, PlaygroundRecord, PlaygroundStore};
use std::path::Path;

/// Opens the current image, migrating legacy images first.
fn open(ctx: &HandlerContext) -> Result<(PlaygroundStore, sqlplay_store::MigrationReport)> {
    let migrator = Migrator::new(ctx.storage_dir(), &ctx.config.environment);
    Ok(migrator.run()?)
}

pub fn save(
    ctx: &HandlerContext,
    name: &str,
    dialect: &str,
    preset: Option<String>,
    dir: Option<&Path>,
) -> Result<()> {
    let mut playground = Playground::from_registry(dialect, preset.as_deref())?;
    if let Some(dir) = dir {
        playground = playground.with_overrides(&read_overrides(dir)?);
    }

    let (mut store, _) = open(ctx)?;
    let mut record = PlaygroundRecord::new(name, playground.dialect, preset, playground.files);
    store.save(&mut record)?;

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("Saved {} as {}", record.name, record.id);
    }
    Ok(())
}

/// A saved playground on top of its dialect's (and preset's) files.
pub fn load_saved(ctx: &HandlerContext, id: &str) -> Result<Playground> {
    let (mut store, _) = open(ctx)?;
    let record = store
        .get(id)?
        .ok_or_else(|| anyhow!("No saved playground with id {}", id))?;

    let base = sqlplay_registry::resolve_file_tree_or_core(
        record.dialect.as_str(),
        record.preset.as_deref(),
    )?;
    Ok(Playground::new(record.dialect, base).with_overrides(&record.files))
}

pub fn list(ctx: &HandlerContext) -> Result<()> {
    let (mut store, _) = open(ctx)?;
    let records = store.list()?;

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No saved playgrounds.");
        return Ok(());
    }

    println!(
        "{:<36} {:<20} {:<10} {:<10} UPDATED",
        "ID", "NAME", "DIALECT", "PRESET"
    );
    for record in &records {
        let id = format!("{:<36}", record.id);
        if ctx.color() {
            print!("{}", id.yellow());
        } else {
            print!("{}", id);
        }
        println!(
            " {:<20} {:<10} {:<10} {}",
            record.name,
            record.dialect.as_str(),
            record.preset.as_deref().unwrap_or("-"),
            record.updated_at
        );
    }
    Ok(())
}

pub fn delete(ctx: &HandlerContext, id: &str) -> Result<()> {
    let (mut store, _) = open(ctx)?;
    if !store.delete(id)? {
        return Err(anyhow!("No saved playground with id {}", id));
    }
    println!("Deleted {}", id);
    Ok(())
}

pub fn migrate(ctx: &HandlerContext) -> Result<()> {
    let (_, report) = open(ctx)?;

    let Some(from) = &report.migrated_from else {
        println!("Store is up to date.");
        return Ok(());
    };

    println!(
        "Migrated {} playground(s) from {} ({} already present).",
        report.absorbed, from, report.skipped
    );
    for warning in &report.warnings {
        let line = format!("warning: {}", warning);
        if ctx.color() {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }
    Ok(())
}
