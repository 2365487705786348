//! Subcommand handlers

pub(crate) mod analyze;
pub(crate) mod checkpoint;
pub(crate) mod config;
pub(crate) mod report;

pub(crate) use analyze::handle_analyze_command;
pub(crate) use checkpoint::handle_checkpoint_command;
pub(crate) use config::handle_config_command;
pub(crate) use report::handle_report_command;
