//! Terminal control surface: browse content, pick what goes live, and watch
//! the preview of what the output surface shows.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
