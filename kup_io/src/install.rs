use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use kup_core::Error;
use kup_core::catalog::ToolSpec;

use crate::fetch::Fetcher;
use crate::place::{Placed, place};
use crate::progress::InstallEvent;

/// Progress events are dropped rather than queued once the consumer falls
/// this far behind; the terminal event always waits for room.
const EVENT_BUFFER: usize = 64;

/// One confirmed install: the descriptor, its resolved download URL, and the
/// caller's network settings. Consumed exactly once.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub tool: ToolSpec,
    pub url: String,
    pub dest_dir: PathBuf,
    pub timeout: Duration,
    pub proxy: Option<String>,
}

/// Drive one install to completion on a background task.
///
/// The returned stream yields progress events followed by exactly one
/// terminal event (`Done` or `Failed`), then closes. The staged download is
/// removed on every exit path, including cancellation.
pub fn install(request: InstallRequest, cancel: CancellationToken) -> mpsc::Receiver<InstallEvent> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        let name = request.tool.name.to_string();

        let terminal = match run(&request, &cancel, &tx).await {
            Ok(placed) => {
                if let Some(err) = &placed.post_install_error {
                    tracing::warn!(tool = %name, error = %err, "post-install hook failed");
                    let _ = tx
                        .send(InstallEvent::PostInstallFailed {
                            name: name.clone(),
                            message: err.to_string(),
                        })
                        .await;
                }
                tracing::info!(tool = %name, path = %placed.path.display(), "install complete");
                InstallEvent::Done {
                    name,
                    path: placed.path,
                }
            }
            Err(error) => {
                tracing::warn!(tool = %name, %error, "install failed");
                InstallEvent::Failed { name, error }
            }
        };

        // The terminal event is never dropped; the channel closes after it.
        let _ = tx.send(terminal).await;
    });

    rx
}

async fn run(
    request: &InstallRequest,
    cancel: &CancellationToken,
    events: &mpsc::Sender<InstallEvent>,
) -> Result<Placed, Error> {
    fs::create_dir_all(&request.dest_dir).map_err(|e| {
        Error::storage(format!(
            "failed to create {}: {e}",
            request.dest_dir.display()
        ))
    })?;

    let fetcher = Fetcher::new(request.timeout, request.proxy.as_deref())?;

    // `staged` owns the temporary file: dropped on any error below, consumed
    // by `place` on success.
    let staged = tempfile::Builder::new()
        .prefix(&format!("{}-", request.tool.name))
        .tempfile()
        .map_err(|e| Error::storage(format!("failed to create staging file: {e}")))?
        .into_temp_path();

    tracing::info!(tool = request.tool.name, url = %request.url, "starting download");

    let total = fetcher
        .fetch(request.tool.name, &request.url, &staged, cancel, events)
        .await?;

    let _ = events.try_send(InstallEvent::DownloadCompleted {
        name: request.tool.name.to_string(),
        total_bytes: total,
    });
    let _ = events.try_send(InstallEvent::Placing {
        name: request.tool.name.to_string(),
    });

    place(staged, &request.tool, &request.dest_dir)
}

/// Whether a tool's binary already exists under `dest_dir`.
pub fn is_installed(tool: &ToolSpec, dest_dir: &Path) -> bool {
    dest_dir.join(tool.name).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kup_core::catalog::{ArtifactKind, ToolKind};
    use std::io::Write;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool(name: &'static str, artifact: ArtifactKind) -> ToolSpec {
        ToolSpec {
            name,
            description: "test tool",
            kind: ToolKind::Kind,
            artifact,
            explanation: "",
            post_install: None,
        }
    }

    fn request(tool: ToolSpec, url: String, dest_dir: &Path) -> InstallRequest {
        InstallRequest {
            tool,
            url,
            dest_dir: dest_dir.to_path_buf(),
            timeout: Duration::from_secs(10),
            proxy: None,
        }
    }

    fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use tar::Builder;

        let mut builder = Builder::new(Vec::new());
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, *content).unwrap();
        }
        let tar_data = builder.into_inner().unwrap();

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar_data).unwrap();
        encoder.finish().unwrap()
    }

    /// Staging files left in the system temp dir for the given tool name.
    fn staging_leftovers(prefix: &str) -> Vec<PathBuf> {
        fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(prefix))
            })
            .collect()
    }

    async fn drain(mut rx: mpsc::Receiver<InstallEvent>) -> Vec<InstallEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn assert_single_terminal(events: &[InstallEvent]) {
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1, "expected exactly one terminal event");
        assert!(
            events.last().unwrap().is_terminal(),
            "terminal event must be last"
        );
    }

    #[tokio::test]
    async fn raw_binary_install_completes() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let body = vec![0xA5u8; 256 * 1024];

        Mock::given(method("GET"))
            .and(path("/dl/alphatool"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dest_dir = tmp.path().join("bin");
        let rx = install(
            request(
                tool("alphatool", ArtifactKind::Binary),
                format!("{}/dl/alphatool", server.uri()),
                &dest_dir,
            ),
            CancellationToken::new(),
        );
        let events = drain(rx).await;

        assert_single_terminal(&events);
        let installed = match events.last().unwrap() {
            InstallEvent::Done { path, .. } => path.clone(),
            other => panic!("expected Done, got {other:?}"),
        };
        assert_eq!(installed, dest_dir.join("alphatool"));
        assert_eq!(fs::read(&installed).unwrap(), body);

        // Progress is monotonic and the completion total matches the body.
        let mut last = 0u64;
        let mut completed_total = None;
        for event in &events {
            match event {
                InstallEvent::DownloadProgress { downloaded, .. } => {
                    assert!(*downloaded >= last, "progress went backwards");
                    last = *downloaded;
                }
                InstallEvent::DownloadCompleted { total_bytes, .. } => {
                    completed_total = Some(*total_bytes);
                }
                _ => {}
            }
        }
        assert_eq!(completed_total, Some(body.len() as u64));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&installed).unwrap().permissions().mode();
            assert!(mode & 0o111 != 0, "installed binary is not executable");
        }

        assert!(staging_leftovers("alphatool-").is_empty());
    }

    #[tokio::test]
    async fn archive_install_extracts_named_entry() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();

        let binary = b"fake k9s build".as_slice();
        let archive = tar_gz(&[("k9s", binary), ("LICENSE", b"MIT".as_slice())]);

        Mock::given(method("GET"))
            .and(path("/dl/k9s.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .mount(&server)
            .await;

        let dest_dir = tmp.path().join("bin");
        let rx = install(
            request(
                tool("archtool", ArtifactKind::TarGz { entry: "k9s" }),
                format!("{}/dl/k9s.tar.gz", server.uri()),
                &dest_dir,
            ),
            CancellationToken::new(),
        );
        let events = drain(rx).await;

        assert_single_terminal(&events);
        assert!(matches!(events.last().unwrap(), InstallEvent::Done { .. }));
        assert_eq!(fs::read(dest_dir.join("archtool")).unwrap(), binary);
        assert!(!dest_dir.join("LICENSE").exists());
        assert!(staging_leftovers("archtool-").is_empty());
    }

    #[tokio::test]
    async fn http_404_fails_without_touching_destination() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/dl/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dest_dir = tmp.path().join("bin");
        let rx = install(
            request(
                tool("gonetool", ArtifactKind::Binary),
                format!("{}/dl/gone", server.uri()),
                &dest_dir,
            ),
            CancellationToken::new(),
        );
        let events = drain(rx).await;

        assert_single_terminal(&events);
        match events.last().unwrap() {
            InstallEvent::Failed { error, .. } => {
                assert_eq!(*error, Error::DownloadFailed { status: 404 });
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(!dest_dir.join("gonetool").exists());
        assert!(staging_leftovers("gonetool-").is_empty());
    }

    #[tokio::test]
    async fn archive_missing_entry_fails_cleanly() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();

        let archive = tar_gz(&[("LICENSE", b"MIT".as_slice())]);

        Mock::given(method("GET"))
            .and(path("/dl/empty.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .mount(&server)
            .await;

        let dest_dir = tmp.path().join("bin");
        let rx = install(
            request(
                tool("emptytool", ArtifactKind::TarGz { entry: "k9s" }),
                format!("{}/dl/empty.tar.gz", server.uri()),
                &dest_dir,
            ),
            CancellationToken::new(),
        );
        let events = drain(rx).await;

        assert_single_terminal(&events);
        match events.last().unwrap() {
            InstallEvent::Failed { error, .. } => {
                assert_eq!(
                    *error,
                    Error::ArchiveEntryNotFound {
                        entry: "k9s".to_string()
                    }
                );
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(!dest_dir.join("emptytool").exists());
        assert!(staging_leftovers("emptytool-").is_empty());
    }

    #[tokio::test]
    async fn cancelled_request_ends_in_cancelled_failure() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/dl/big"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 8 * 1024 * 1024]))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let dest_dir = tmp.path().join("bin");
        let rx = install(
            request(
                tool("canceltool", ArtifactKind::Binary),
                format!("{}/dl/big", server.uri()),
                &dest_dir,
            ),
            cancel,
        );
        let events = drain(rx).await;

        assert_single_terminal(&events);
        match events.last().unwrap() {
            InstallEvent::Failed { error, .. } => assert_eq!(*error, Error::Cancelled),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(!dest_dir.join("canceltool").exists());
        assert!(staging_leftovers("canceltool-").is_empty());
    }

    #[tokio::test]
    async fn concurrent_installs_of_different_tools_are_independent() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/dl/one"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"first".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dl/two"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second".to_vec()))
            .mount(&server)
            .await;

        let dest_dir = tmp.path().join("bin");
        let rx_one = install(
            request(
                tool("onetool", ArtifactKind::Binary),
                format!("{}/dl/one", server.uri()),
                &dest_dir,
            ),
            CancellationToken::new(),
        );
        let rx_two = install(
            request(
                tool("twotool", ArtifactKind::Binary),
                format!("{}/dl/two", server.uri()),
                &dest_dir,
            ),
            CancellationToken::new(),
        );

        let (events_one, events_two) = tokio::join!(drain(rx_one), drain(rx_two));
        assert!(matches!(
            events_one.last().unwrap(),
            InstallEvent::Done { .. }
        ));
        assert!(matches!(
            events_two.last().unwrap(),
            InstallEvent::Done { .. }
        ));
        assert_eq!(fs::read(dest_dir.join("onetool")).unwrap(), b"first");
        assert_eq!(fs::read(dest_dir.join("twotool")).unwrap(), b"second");
    }

    #[test]
    fn is_installed_probes_the_destination() {
        let tmp = TempDir::new().unwrap();
        let probe = tool("probe", ArtifactKind::Binary);

        assert!(!is_installed(&probe, tmp.path()));
        fs::write(tmp.path().join("probe"), b"bin").unwrap();
        assert!(is_installed(&probe, tmp.path()));
    }
}
