pub mod binary_resolver;
pub mod config;

pub use config::Config;
