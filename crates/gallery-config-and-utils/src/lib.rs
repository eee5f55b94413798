//! Core types, configuration, and utilities for the shader gallery tools.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_LOG_LEVEL, DEFAULT_POOL_MAX_SIZE,
    MAX_IMPORT_LINE_BYTES,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::{Paths, DATA_PATH_ENV, DEFAULT_DATA_PATH};
