pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod types;

pub use config::CoordConfig;
pub use db::CoordDb;
pub use error::{CoordError, Result};
pub use types::*;
