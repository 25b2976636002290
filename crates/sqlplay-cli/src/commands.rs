use super::args::{Cli, Commands};
use super::handlers::{self, HandlerContext};
use crate::logging;
use anyhow::Result;
use sqlplay_runtime::{Config, resolve_data_dir};

pub fn run(cli: Cli) -> Result<()> {
    logging::init(cli.log_level);

    let data_dir = resolve_data_dir(cli.data_dir.as_deref())?;
    let config = Config::load_from(&Config::path_in(&data_dir))?;
    let ctx = HandlerContext {
        data_dir,
        config,
        format: cli.format,
    };

    match cli.command {
        Commands::Presets { dialect } => handlers::presets::handle(&ctx, &dialect),

        Commands::Files {
            dialect,
            preset,
            out,
        } => handlers::files::handle(&ctx, &dialect, preset.as_deref(), out.as_deref()),

        Commands::Run {
            dialect,
            preset,
            dir,
            saved,
            seed,
        } => {
            let playground = match saved {
                Some(id) => handlers::store::load_saved(&ctx, &id)?,
                None => {
                    let dialect = dialect.unwrap_or_else(|| ctx.config.dialect().to_string());
                    handlers::run::resolve(&dialect, preset.as_deref(), dir.as_deref())?
                }
            };
            handlers::run::handle(&ctx, playground, seed)
        }

        Commands::Save {
            name,
            dialect,
            preset,
            dir,
        } => handlers::store::save(&ctx, &name, &dialect, preset, dir.as_deref()),

        Commands::List => handlers::store::list(&ctx),

        Commands::Delete { id } => handlers::store::delete(&ctx, &id),

        Commands::Migrate => handlers::store::migrate(&ctx),
    }
}
