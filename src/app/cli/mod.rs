//! Command line parsing and configuration loading

mod args;
mod config;

pub use args::Args;
pub use config::{
    default_config_path, load_config_file, shift_level, ConfigError, ConfigResult, RelayConfig,
};

#[cfg(test)]
mod tests;
