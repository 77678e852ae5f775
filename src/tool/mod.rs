pub mod availability;
pub mod command;
pub mod install;
pub mod models;

pub use availability::AvailabilityChecker;
pub use command::downloader_command;
pub use install::{install_instructions, OsFamily};
pub use models::ToolConfig;
