mod args;
mod commands;
mod logging;
mod render;

pub use args::Cli;
pub use logging::init_tracing;
