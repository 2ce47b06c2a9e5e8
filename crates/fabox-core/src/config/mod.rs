//! fabox.toml loading, validation and path resolution.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_fabox_toml, parse_fabox_toml_str, to_toml};
pub use paths::{CONFIG_FILE_NAME, resolve_config_path};
pub use schema::FaboxConfig;
pub use store::ConfigStore;
