//! Archive download into a staging location

use crate::client::{map_reqwest_error, NetClient};
use async_trait::async_trait;
use futures::StreamExt;
use modinstall_errors::{Error, NetworkError};
use modinstall_events::{AppEvent, DownloadEvent, EventEmitter, EventSender, FailureContext};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// A downloaded archive sitting at its final path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    pub path: PathBuf,
    pub size: u64,
    /// BLAKE3 digest of the body, hex encoded
    pub hash: String,
}

/// Retrieves a package archive
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Download `url` to `dest`
    ///
    /// On success `dest` exists and is non-empty. On failure `dest` does
    /// not exist.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchedArchive, Error>;
}

/// HTTP implementation of [`ArchiveFetcher`]
#[derive(Clone)]
pub struct HttpFetcher {
    client: NetClient,
    timeout: Duration,
    event_sender: Option<EventSender>,
}

impl EventEmitter for HttpFetcher {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl HttpFetcher {
    /// Whole-fetch deadline defaults to the client's request timeout
    #[must_use]
    pub fn new(client: NetClient) -> Self {
        let timeout = client.config().timeout;
        Self {
            client,
            timeout,
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    async fn download(&self, url: &str, part: &Path, dest: &Path) -> Result<(u64, String), Error> {
        let response = self
            .client
            .get_with_events(url, self.event_sender.as_ref())
            .await?;

        if !response.status().is_success() {
            return Err(NetworkError::HttpError {
                status: response.status().as_u16(),
                message: response.status().to_string(),
            }
            .into());
        }

        self.emit(AppEvent::Download(DownloadEvent::Started {
            url: url.to_string(),
            total_size: response.content_length(),
        }));

        if let Some(parent) = part.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(part).await?;
        let mut hasher = blake3::Hasher::new();
        let mut size = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_reqwest_error(url, &e))?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if size == 0 {
            return Err(NetworkError::EmptyDownload {
                url: url.to_string(),
            }
            .into());
        }

        fs::rename(part, dest).await?;
        Ok((size, hasher.finalize().to_hex().to_string()))
    }
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchedArchive, Error> {
        crate::parse_url(url)?;

        let part = part_path(dest);
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, self.download(url, &part, dest)).await
        {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout {
                url: url.to_string(),
            }
            .into()),
        };

        match outcome {
            Ok((size, hash)) => {
                self.emit(AppEvent::Download(DownloadEvent::Completed {
                    url: url.to_string(),
                    final_size: size,
                    total_time: started.elapsed(),
                    hash: hash.clone(),
                }));
                Ok(FetchedArchive {
                    path: dest.to_path_buf(),
                    size,
                    hash,
                })
            }
            Err(err) => {
                let err = match err {
                    Error::Io { message, .. } => NetworkError::DownloadFailed(message).into(),
                    other => other,
                };
                let _ = fs::remove_file(&part).await;
                tracing::warn!(%url, error = %err, "archive download failed");
                self.emit(AppEvent::Download(DownloadEvent::Failed {
                    url: url.to_string(),
                    failure: FailureContext::from_error(&err),
                }));
                Err(err)
            }
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
