//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use modinstall_errors::{Error, NetworkError};
    use modinstall_events::{channel, AppEvent, DownloadEvent};
    use modinstall_net::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn fast_client() -> NetClient {
        NetClient::new(NetConfig {
            retry_count: 1,
            retry_delay: Duration::from_millis(10),
            ..NetConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_archive() {
        let server = MockServer::start();
        let (tx, mut rx) = channel();

        let content = b"PK\x03\x04 not really a zip but non-empty";
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/acme/widgets/archive/refs/heads/main.zip");
            then.status(200)
                .header("content-length", content.len().to_string())
                .body(content);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("run").join("module.zip");
        let fetcher = HttpFetcher::new(fast_client()).with_event_sender(tx);
        let url = server.url("/acme/widgets/archive/refs/heads/main.zip");

        let fetched = fetcher.fetch(&url, &dest).await.unwrap();

        mock.assert();
        assert_eq!(fetched.size, content.len() as u64);
        assert_eq!(fetched.hash, blake3::hash(content).to_hex().to_string());
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), content);
        assert!(!temp.path().join("run").join("module.zip.part").exists());

        let mut saw_start = false;
        let mut saw_complete = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Download(DownloadEvent::Started { .. }) => saw_start = true,
                AppEvent::Download(DownloadEvent::Completed { .. }) => saw_complete = true,
                _ => {}
            }
        }
        assert!(saw_start);
        assert!(saw_complete);
    }

    #[tokio::test]
    async fn test_http_error_leaves_no_file() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.zip");
            then.status(404).body("Not Found");
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("module.zip");
        let fetcher = HttpFetcher::new(fast_client());

        let error = fetcher
            .fetch(&server.url("/missing.zip"), &dest)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            Error::Network(NetworkError::HttpError { status: 404, .. })
        ));
        assert!(!dest.exists());
        assert!(!temp.path().join("module.zip.part").exists());
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/empty.zip");
            then.status(200);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("module.zip");
        let fetcher = HttpFetcher::new(fast_client());

        let error = fetcher
            .fetch(&server.url("/empty.zip"), &dest)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            Error::Network(NetworkError::EmptyDownload { .. })
        ));
        assert!(!dest.exists());
        assert!(!temp.path().join("module.zip.part").exists());
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky.zip");
            then.status(503);
        });

        let temp = tempdir().unwrap();
        let fetcher = HttpFetcher::new(fast_client());

        let error = fetcher
            .fetch(&server.url("/flaky.zip"), &temp.path().join("module.zip"))
            .await
            .unwrap_err();

        mock.assert_hits(2);
        assert!(matches!(
            error,
            Error::Network(NetworkError::HttpError { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow.zip");
            then.status(200)
                .body("late")
                .delay(Duration::from_secs(3));
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("module.zip");
        let client = NetClient::new(NetConfig {
            retry_count: 0,
            ..NetConfig::default()
        })
        .unwrap();
        let fetcher = HttpFetcher::new(client).with_timeout(Duration::from_millis(200));

        let error = fetcher
            .fetch(&server.url("/slow.zip"), &dest)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Network(NetworkError::Timeout { .. })));
        assert_eq!(error.kind(), modinstall_errors::ErrorKind::Timeout);
        assert!(!dest.exists());
    }
}
