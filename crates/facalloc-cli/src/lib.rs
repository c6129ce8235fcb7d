pub mod cli;
pub mod config;
pub mod instance;

pub use cli::{Cli, Commands};
pub use config::{load_config, CliConfig};
pub use instance::{load_instance, write_instance, InstanceFile};
