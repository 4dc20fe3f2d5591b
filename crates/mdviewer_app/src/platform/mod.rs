mod app;
mod args;
mod commands;
mod logging;
mod surface;

pub use app::run_app;
