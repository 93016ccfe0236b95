use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use kup_core::Error;

use crate::progress::InstallEvent;

/// Transfer engine: one HTTP GET streamed into a staging sink.
///
/// Never retries; classifying and surfacing the first failure is the whole
/// contract. Retry, if wanted, is a fresh request at the caller.
#[derive(Debug)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Build a client carrying this request's timeout and optional proxy.
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kup/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::network(format!("invalid proxy url: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::network(format!("failed to build http client: {e}")))?;

        Ok(Self { client })
    }

    /// Stream `url` into the file at `sink`, emitting a best-effort progress
    /// event after each chunk. Returns the total bytes written.
    ///
    /// Cancellation is checked at chunk granularity; an aborted transfer
    /// returns `Cancelled` and leaves the partially written sink for the
    /// caller to clean up.
    pub async fn fetch(
        &self,
        name: &str,
        url: &str,
        sink: impl AsRef<Path>,
        cancel: &CancellationToken,
        events: &mpsc::Sender<InstallEvent>,
    ) -> Result<u64, Error> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DownloadFailed {
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length();
        let _ = events.try_send(InstallEvent::DownloadStarted {
            name: name.to_string(),
            total_bytes,
        });

        let mut sink = tokio::fs::File::create(sink.as_ref())
            .await
            .map_err(|e| Error::storage(format!("failed to open staging file: {e}")))?;

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                chunk = stream.next() => chunk,
            };

            let bytes = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) if e.is_timeout() => {
                    return Err(Error::network(format!("download timed out: {e}")));
                }
                Some(Err(e)) => {
                    return Err(Error::TransferInterrupted {
                        message: e.to_string(),
                    });
                }
                None => break,
            };

            sink.write_all(&bytes)
                .await
                .map_err(|e| Error::storage(format!("failed to write staging file: {e}")))?;
            downloaded += bytes.len() as u64;

            // Drop the event rather than block: progress reporting must
            // never slow the transfer.
            let _ = events.try_send(InstallEvent::DownloadProgress {
                name: name.to_string(),
                downloaded,
                total_bytes,
            });
        }

        if let Some(total) = total_bytes
            && downloaded < total
        {
            return Err(Error::TransferInterrupted {
                message: format!("stream ended after {downloaded} of {total} bytes"),
            });
        }

        sink.flush()
            .await
            .map_err(|e| Error::storage(format!("failed to flush staging file: {e}")))?;

        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel() -> (mpsc::Sender<InstallEvent>, mpsc::Receiver<InstallEvent>) {
        mpsc::channel(1024)
    }

    #[tokio::test]
    async fn streams_body_to_sink_with_progress() {
        let server = MockServer::start().await;
        let body = vec![0x42u8; 96 * 1024];

        Mock::given(method("GET"))
            .and(path("/blob"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let sink = tmp.path().join("staged");
        let (tx, mut rx) = channel();

        let fetcher = Fetcher::new(Duration::from_secs(10), None).unwrap();
        let written = fetcher
            .fetch(
                "blobtool",
                &format!("{}/blob", server.uri()),
                &sink,
                &CancellationToken::new(),
                &tx,
            )
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&sink).unwrap(), body);

        drop(tx);
        let mut last = 0u64;
        let mut saw_start = false;
        while let Some(event) = rx.recv().await {
            match event {
                InstallEvent::DownloadStarted { total_bytes, .. } => {
                    saw_start = true;
                    assert_eq!(total_bytes, Some(body.len() as u64));
                }
                InstallEvent::DownloadProgress { downloaded, .. } => {
                    assert!(downloaded >= last, "progress went backwards");
                    last = downloaded;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert!(saw_start);
        assert_eq!(last, body.len() as u64);
    }

    #[tokio::test]
    async fn non_2xx_status_fails_immediately() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let sink = tmp.path().join("staged");
        let (tx, _rx) = channel();

        let fetcher = Fetcher::new(Duration::from_secs(10), None).unwrap();
        let err = fetcher
            .fetch(
                "missingtool",
                &format!("{}/missing", server.uri()),
                &sink,
                &CancellationToken::new(),
                &tx,
            )
            .await
            .unwrap_err();

        assert_eq!(err, Error::DownloadFailed { status: 404 });
        // The sink is only opened after a successful status check.
        assert!(!sink.exists());
    }

    #[tokio::test]
    async fn cancelled_context_aborts_the_transfer() {
        let server = MockServer::start().await;
        let body = vec![0u8; 4 * 1024 * 1024];

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let sink = tmp.path().join("staged");
        let (tx, _rx) = channel();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let fetcher = Fetcher::new(Duration::from_secs(10), None).unwrap();
        let err = fetcher
            .fetch(
                "slowtool",
                &format!("{}/slow", server.uri()),
                &sink,
                &cancel,
                &tx,
            )
            .await
            .unwrap_err();

        assert_eq!(err, Error::Cancelled);
    }

    #[tokio::test]
    async fn connection_failure_is_a_network_error() {
        let (tx, _rx) = channel();
        let tmp = TempDir::new().unwrap();
        let sink = tmp.path().join("staged");

        // Nothing listens on this port.
        let fetcher = Fetcher::new(Duration::from_secs(2), None).unwrap();
        let err = fetcher
            .fetch(
                "unreachable",
                "http://127.0.0.1:9/blob",
                &sink,
                &CancellationToken::new(),
                &tx,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Network { .. }), "got {err:?}");
    }

    #[test]
    fn rejects_malformed_proxy_url() {
        let err = Fetcher::new(Duration::from_secs(1), Some("not a url")).unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
    }
}
