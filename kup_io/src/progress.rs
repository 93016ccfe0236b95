use std::path::PathBuf;

use kup_core::Error;

/// Progress events during installation
#[derive(Debug, Clone)]
pub enum InstallEvent {
    /// Response headers received, streaming begins (with total size if known)
    DownloadStarted {
        name: String,
        total_bytes: Option<u64>,
    },
    /// Download progress update
    DownloadProgress {
        name: String,
        downloaded: u64,
        total_bytes: Option<u64>,
    },
    /// Download completed, the staged payload is whole
    DownloadCompleted { name: String, total_bytes: u64 },
    /// Placement (move or extract, then chmod) started
    Placing { name: String },
    /// The post-install hook failed; the binary itself is installed
    PostInstallFailed { name: String, message: String },
    /// Terminal: installed at `path`
    Done { name: String, path: PathBuf },
    /// Terminal: the install did not complete
    Failed { name: String, error: Error },
}

impl InstallEvent {
    /// Whether this event ends the stream for its request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InstallEvent::Done { .. } | InstallEvent::Failed { .. }
        )
    }
}
