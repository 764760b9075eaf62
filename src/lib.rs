pub mod app;
pub mod capability;
pub mod cli;
pub mod config;
pub mod destination;
pub mod error;
pub mod finder;
pub mod logging;
pub mod path_set;
pub mod prompt;
pub mod transfer;
pub mod tui;
pub mod util;
pub mod workflow;

pub use error::{AppError, ValidationError};
