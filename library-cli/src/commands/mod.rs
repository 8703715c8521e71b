//! Command implementations for libraryctl

pub mod config;
pub mod explain;
pub mod serve;

pub use config::run_config;
pub use explain::run_explain;
pub use serve::run_serve;
