use clap::Parser;
use ideacanvas::cli::{run, ui, Cli};
use ideacanvas::config::{BackendKind, ConfigStore};
use ideacanvas::logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => ConfigStore::from_path(path),
        None => ConfigStore::from_default_location()?,
    };
    let mut config = store.load_or_init()?;
    config.apply_env()?;
    if cli.local {
        config.backend = BackendKind::Local;
    }

    // A broken log directory only disables logging
    let _guard = match config
        .log_dir()
        .and_then(|dir| logging::init(&dir, &config.log.level))
    {
        Ok(guard) => Some(guard),
        Err(e) => {
            ui::warning(&format!("logging disabled: {:#}", e));
            None
        }
    };
    tracing::info!(backend = ?config.backend, config = %store.path().display(), "starting");

    run(cli.command, &config)
}
