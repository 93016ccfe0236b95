pub mod catalog;
pub mod error;
pub mod platform;

pub use catalog::{ArtifactKind, Resolved, ToolKind, ToolSpec, all_tools, resolve};
pub use error::Error;
pub use platform::Platform;
