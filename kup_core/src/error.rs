use thiserror::Error;

/// Failure taxonomy for a single install attempt.
///
/// Every variant is fatal for the request it occurs in, with one exception:
/// `PostInstall` is a warning — the binary is already in place when a
/// post-install hook fails, and it stays installed. `Cancelled` is a normal
/// terminal outcome, not a fault.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("download failed with status {status}")]
    DownloadFailed { status: u16 },

    #[error("transfer interrupted: {message}")]
    TransferInterrupted { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("archive entry '{entry}' not found")]
    ArchiveEntryNotFound { entry: String },

    #[error("archive corrupt: {message}")]
    ArchiveCorrupt { message: String },

    #[error("post-install step failed: {message}")]
    PostInstall { message: String },

    #[error("cancelled")]
    Cancelled,
}

impl Error {
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Error::Network {
            message: message.into(),
        }
    }
}
