pub mod config_handler;
pub mod run;
