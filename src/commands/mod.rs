pub mod agent;
pub mod modes;
pub mod utils;

pub use modes::run_mode_command;
