//! CLI commands

pub mod check;
pub mod init;
pub mod list;
pub mod new;
pub mod render;

/// Output format for reports and listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
