//! HTTP client with connection pooling and retry logic

use modinstall_config::NetworkConfig;
use modinstall_errors::{Error, NetworkError};
use modinstall_events::{AppEvent, DownloadEvent, EventEmitter, EventSender};
use reqwest::{redirect, Client, Response, StatusCode};
use std::time::Duration;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Skip certificate verification. Off unless explicitly requested.
    pub accept_invalid_certs: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(15),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 4,
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
            max_redirects: 10,
            user_agent: format!("modinstall/{}", env!("CARGO_PKG_VERSION")),
            accept_invalid_certs: false,
        }
    }
}

impl From<&NetworkConfig> for NetConfig {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout),
            connect_timeout: Duration::from_secs(config.connect_timeout),
            retry_count: config.retries,
            retry_delay: Duration::from_secs(config.retry_delay),
            accept_invalid_certs: !config.verify_tls,
            ..Self::default()
        }
    }
}

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate verification is disabled");
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::TlsError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(NetConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Execute a GET request with retries
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after all retry attempts.
    pub async fn get(&self, url: &str) -> Result<Response, Error> {
        self.get_with_events(url, None).await
    }

    /// Execute a GET request with retries, reporting each retry as an event
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after all retry attempts.
    pub async fn get_with_events(
        &self,
        url: &str,
        events: Option<&EventSender>,
    ) -> Result<Response, Error> {
        self.retry_request(url, events, || self.client.get(url).send())
            .await
    }

    /// Execute a request with retries
    ///
    /// Connection failures, timeouts and 5xx responses are retried with a
    /// linear backoff. The last 5xx response is returned as-is so callers
    /// can report the status.
    async fn retry_request<F, Fut>(
        &self,
        url: &str,
        events: Option<&EventSender>,
        mut f: F,
    ) -> Result<Response, Error>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                let delay = self.config.retry_delay * attempt;
                let reason = last_error
                    .as_ref()
                    .map_or_else(|| "server error".to_string(), ToString::to_string);
                if let Some(tx) = events {
                    tx.emit(AppEvent::Download(DownloadEvent::Retrying {
                        url: url.to_string(),
                        attempt,
                        max_attempts: self.config.retry_count,
                        reason,
                        backoff_delay: delay,
                    }));
                }
                tokio::time::sleep(delay).await;
            }

            match f().await {
                Ok(response) => {
                    if response.status() == StatusCode::TOO_MANY_REQUESTS {
                        if let Some(retry_after) = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                        {
                            return Err(NetworkError::RateLimited {
                                seconds: retry_after,
                            }
                            .into());
                        }
                    }

                    if response.status().is_server_error() && attempt < self.config.retry_count {
                        tracing::debug!(%url, status = %response.status(), "retrying server error");
                        last_error = None;
                        continue;
                    }

                    return Ok(response);
                }
                Err(e) => {
                    let retry = Self::should_retry(&e);
                    last_error = Some(e);
                    if !retry {
                        break;
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(map_reqwest_error(url, &e)),
            None => Err(NetworkError::DownloadFailed("Unknown error".to_string()).into()),
        }
    }

    /// Determine if an error should be retried
    fn should_retry(error: &reqwest::Error) -> bool {
        error.is_timeout()
            || error.is_connect()
            || error.status().is_some_and(|s| s.is_server_error())
    }
}

/// Classify a transport error
pub(crate) fn map_reqwest_error(url: &str, error: &reqwest::Error) -> Error {
    if error.is_timeout() {
        return NetworkError::Timeout {
            url: url.to_string(),
        }
        .into();
    }
    if error.is_connect() {
        let detail = format!("{error:?}");
        if detail.contains("certificate") || detail.contains("Certificate") {
            return NetworkError::TlsError(error.to_string()).into();
        }
        return NetworkError::ConnectionRefused(error.to_string()).into();
    }
    NetworkError::DownloadFailed(error.to_string()).into()
}
