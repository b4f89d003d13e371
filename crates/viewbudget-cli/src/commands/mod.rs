pub mod common;
pub mod config;
pub mod limit;
pub mod reset;
pub mod site;
pub mod status;
pub mod watch;
