pub mod env;
mod loader;

pub use env::{AppConfig, BackendConfig, DirectoryConfig, SyncMode};
pub use loader::{load_config, parse_base_url};
