pub mod commands;
pub mod config;
pub mod daemon;
pub mod terminal;

pub use config::CliConfig;
pub use daemon::run_daemon;
pub use terminal::TerminalAlertSink;
