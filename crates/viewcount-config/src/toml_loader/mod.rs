//! TOML config file loading and creation.

mod env;
mod loader;
mod paths;
mod template;


pub use env::{apply_env_overrides, STORE_URL_ENV};
pub use loader::{load_default, load_from_path, parse_config};
pub use paths::{create_default_config, default_config_path};
