pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod handlers;
pub mod js_templates;
pub mod output;
pub mod timeouts;
pub mod utils;

pub use config::Config;
pub use error::ExportError;

pub type Result<T> = std::result::Result<T, ExportError>;
