use super::HandlerContext;
use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use sqlplay_runtime::{Playground, RunOutcome, read_overrides};
use sqlplay_types::{OutputEvent, StatementLogEntry};
use std::io::Write;
use std::path::Path;

/// Registry files for `dialect`/`preset`, with `dir` overrides on top.
pub fn resolve(dialect: &str, preset: Option<&str>, dir: Option<&Path>) -> Result<Playground> {
    let playground = Playground::from_registry(dialect, preset)?;
    match dir {
        Some(dir) => Ok(playground.with_overrides(&read_overrides(dir)?)),
        None => Ok(playground),
    }
}

pub fn handle(ctx: &HandlerContext, playground: Playground, seed: Option<u64>) -> Result<()> {
    let toolkit = ctx.config.toolkit(seed);
    let mut stream = playground.spawn(toolkit)?;
    let color = ctx.color();
    let stdout = std::io::stdout();

    for event in stream.by_ref() {
        let mut out = stdout.lock();
        if ctx.is_json() {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
        } else {
            print_plain(&mut out, &event, color)?;
        }
        out.flush()?;
    }

    let (_, outcome) = stream.finish()?;
    match outcome {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Failed(err) => Err(err.into()),
        RunOutcome::Abandoned => bail!("run was abandoned"),
    }
}

fn print_plain(out: &mut impl Write, event: &OutputEvent, color: bool) -> Result<()> {
    match event {
        OutputEvent::Console { text, .. } => writeln!(out, "{}", text)?,
        OutputEvent::Statement(entry) => {
            let line = format_statement(entry);
            if color {
                writeln!(out, "{}", line.dimmed())?;
            } else {
                writeln!(out, "{}", line)?;
            }
        }
        // Reported once, through the command's error.
        OutputEvent::Error(_) => {}
    }
    Ok(())
}

fn format_statement(entry: &StatementLogEntry) -> String {
    if entry.params.is_empty() {
        return format!("> {}", entry.sql);
    }
    let params = serde_json::to_string(&entry.params).unwrap_or_default();
    format!("> {}  {}", entry.sql, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlplay_types::{FileName, Value};

    #[test]
    fn test_plain_statement_lines() {
        let mut out = Vec::new();
        print_plain(
            &mut out,
            &OutputEvent::Statement(StatementLogEntry::new(
                "insert into users (name) values (?1)",
                vec![Value::from("Ada")],
            )),
            false,
        )
        .unwrap();
        print_plain(
            &mut out,
            &OutputEvent::Console {
                file: FileName::Index,
                text: "done".to_string(),
            },
            false,
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "> insert into users (name) values (?1)  [\"Ada\"]\ndone\n"
        );
    }
}
