pub mod fetch;
pub mod install;
pub mod place;
pub mod progress;

pub use install::{InstallRequest, install, is_installed};
pub use progress::InstallEvent;
