#![forbid(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod expand;
pub mod export;
pub mod models;
pub mod normalize;
pub mod resolve;
pub mod server;
pub mod store;
pub mod sweep;
pub mod utils;
pub mod xes;

pub use cli::app::{Cli, Command};
pub use error::{ExportError, ExportResult};
