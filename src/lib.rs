//! Core library surface for the worship presenter.
//!
//! The control surface (a Ratatui TUI) browses songs and scripture through
//! the content resolvers and drives a separate output surface through the
//! live controller. Everything the binary needs is re-exported here so
//! integration tests can drive the same pieces headlessly.
pub mod assets;
pub mod config;
pub mod control;
pub mod db;
pub mod logging;
pub mod models;
pub mod presentation;
pub mod resolver;
pub mod transport;
pub mod ui;
pub mod window;

/// Persistence entry points used at startup.
pub use db::{ensure_schema, open_database, seed_defaults};

pub use config::Config;
pub use control::{ControlError, LiveController, SelectionState};
pub use models::{CollectionKind, ContentCollection, NormalizedVerse, Testament};
pub use presentation::{PresentationPayload, PresentationState, TemplateSnapshot};
pub use resolver::{CollectionFilter, ContentResolver, ScriptureResolver, SongResolver};
pub use window::{DisplayHost, HeadlessHost, TerminalHost, WindowManager};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
