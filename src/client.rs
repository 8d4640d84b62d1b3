// Async HTTP client for rlsprobe
// Uses reqwest and tokio; retry with exponential backoff and rate-limit awareness

use crate::errors::ScanError;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const DEFAULT_SERVER_BACKOFF_MS: u64 = 1000;
const DEFAULT_RATE_LIMIT_BACKOFF_MS: u64 = 2000;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client with a fixed retry/backoff policy and no domain knowledge.
///
/// Waits suspend only the calling task; concurrent callers are unaffected by
/// one another's backoff.
pub struct ProbeClient {
    client: Client,
    max_attempts: u32,
    server_backoff: Duration,
    rate_limit_backoff: Duration,
}

impl ProbeClient {
    pub fn new(max_attempts: u32) -> Result<Self, ScanError> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ScanError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
            server_backoff: Duration::from_millis(DEFAULT_SERVER_BACKOFF_MS),
            rate_limit_backoff: Duration::from_millis(DEFAULT_RATE_LIMIT_BACKOFF_MS),
        })
    }

    /// Override backoff bases. Production uses the defaults; tests shrink them.
    pub fn with_backoff(mut self, server: Duration, rate_limit: Duration) -> Self {
        self.server_backoff = server;
        self.rate_limit_backoff = rate_limit;
        self
    }

    /// GET `url` with up to `max_attempts` tries.
    ///
    /// Per attempt: any response that is not 429 and not 5xx is returned
    /// immediately, 2xx and 4xx alike; status classification belongs to the
    /// caller. 429 waits `rate_limit_backoff * 2^attempt` and retries without
    /// consuming a failure. 5xx and transport faults record the error, wait
    /// `server_backoff * 2^attempt`, and retry. Exhaustion returns the last
    /// recorded error.
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<Response, ScanError> {
        let mut last_error: Option<ScanError> = None;

        for attempt in 0..self.max_attempts {
            debug!(url, attempt = attempt + 1, max = self.max_attempts, "request");

            match self.client.get(url).headers(headers.clone()).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if status == 429 {
                        if attempt + 1 == self.max_attempts {
                            break;
                        }
                        let wait = self.rate_limit_backoff * 2u32.pow(attempt);
                        warn!(url, ?wait, "rate limited, backing off");
                        sleep(wait).await;
                        continue;
                    }

                    if status >= 500 {
                        last_error = Some(ScanError::ServerFault {
                            url: url.to_string(),
                            status,
                        });
                        if attempt + 1 == self.max_attempts {
                            break;
                        }
                        sleep(self.server_backoff * 2u32.pow(attempt)).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(source) => {
                    warn!(url, attempt = attempt + 1, error = %source, "transport fault");
                    last_error = Some(ScanError::Transport {
                        url: url.to_string(),
                        source,
                    });
                    if attempt + 1 == self.max_attempts {
                        break;
                    }
                    sleep(self.server_backoff * 2u32.pow(attempt)).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ScanError::RateLimited {
            url: url.to_string(),
        }))
    }
}
