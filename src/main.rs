//! Binary entry point: load configuration, start logging, open the content
//! stores and drive the Ratatui control surface until the operator exits.
use anyhow::Context;
use worship_presenter::config::Config;
use worship_presenter::{
    logging, open_database, run_app, App, LiveController, ScriptureResolver, SongResolver,
    TerminalHost,
};

/// Fatal startup problems (an unreadable config, an unwritable data
/// directory) are reported on the terminal instead of inside the UI.
fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let log_path = logging::init(&config.data_dir(), &config.log_level)?;
    tracing::info!(log = %log_path.display(), "starting worship presenter");

    let conn = open_database(&config.database_path)?;
    let scripture = ScriptureResolver::open(&config.scripture_paths)?;
    let controller = LiveController::new(
        TerminalHost::new(config.displays.clone()),
        config.resend_on_reopen,
    );

    let mut app = App::new(SongResolver::new(conn), scripture, controller, &config)?;
    let result = run_app(&mut app);
    drop(app);

    tracing::info!("worship presenter stopped");
    result
}
