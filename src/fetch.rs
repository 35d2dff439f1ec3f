use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::StatusCode;

// tokio::time::sleep is only available on non-WASM targets.
#[cfg(not(target_arch = "wasm32"))]
use tokio::time::sleep;

use crate::{
    observer::{Subscribers, SubscriptionId},
    Body, Credentials, FetchError, FetchOptions, Result, RetryPolicy,
};

/// Why an attempt is being retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryReason {
    /// The server answered `401 Unauthorized`.
    Unauthorized,
    /// The request failed before a response arrived.
    Network(String),
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => f.write_str("401 unauthorized"),
            Self::Network(message) => write!(f, "network error: {message}"),
        }
    }
}

/// Progress notifications delivered to [`RetryingFetcher::subscribe`] callbacks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchEvent {
    /// Attempt `attempt` failed transiently; the next one starts after `delay`.
    Retrying {
        url: String,
        attempt: usize,
        delay: Duration,
        reason: RetryReason,
    },
    /// A request succeeded after at least one retry.
    Recovered { url: String, attempts: usize },
    /// A request ended with a terminal error.
    Failed { url: String, attempts: usize },
}

type Callback = Arc<dyn Fn(&FetchEvent) + Send + Sync>;

/// Issues a single request with linear-backoff retries using a fresh client.
///
/// `max_retries` is the total attempt budget (the usual value is `3`) and
/// `initial_delay_ms` the base backoff (usually `1000`); see
/// [`RetryPolicy::default`].
///
/// # Example
///
/// ```no_run
/// use pagekit::{fetch_with_retry, FetchOptions};
///
/// # async fn run() -> pagekit::Result<()> {
/// let response = fetch_with_retry("https://example.com/api/me", &FetchOptions::new(), 3, 1000).await?;
/// assert!(response.status().is_success());
/// # Ok(())
/// # }
/// ```
pub async fn fetch_with_retry(
    url: &str,
    options: &FetchOptions,
    max_retries: usize,
    initial_delay_ms: u64,
) -> Result<reqwest::Response> {
    RetryingFetcher::new()
        .with_policy(RetryPolicy::new(max_retries, initial_delay_ms))
        .fetch(url, options)
        .await
}

/// HTTP fetcher that retries `401` responses and network failures.
///
/// Clones share the underlying connection pool and subscriber list.
#[derive(Clone)]
pub struct RetryingFetcher {
    http: reqwest::Client,
    policy: RetryPolicy,
    subscribers: Arc<Mutex<Subscribers<Callback>>>,
}

impl fmt::Debug for RetryingFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("RetryingFetcher")
            .field("policy", &self.policy)
            .field("subscribers", &subscribers)
            .finish()
    }
}

impl Default for RetryingFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryingFetcher {
    /// Creates a fetcher with [`RetryPolicy::default`].
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Creates a fetcher around an existing `reqwest` client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            policy: RetryPolicy::default(),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
        }
    }

    /// Replaces the retry policy. A zero attempt budget is raised to 1.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = RetryPolicy::new(policy.max_retries, policy.initial_delay_ms);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Registers a callback for [`FetchEvent`]s.
    ///
    /// Callbacks run synchronously inside the fetching task, in registration order.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&FetchEvent) + Send + Sync + 'static,
    {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Arc::new(callback))
    }

    /// Removes a callback. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Sends `options` to `url`, retrying per the configured policy.
    ///
    /// - `2xx` returns the response.
    /// - `401` waits `initial_delay_ms * attempt` and retries while attempts remain.
    /// - Any other status fails at once with [`FetchError::Http`].
    /// - Network errors retry like `401`; the last one is returned unchanged
    ///   as [`FetchError::Transport`].
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<reqwest::Response> {
        let max_retries = self.policy.max_retries.max(1);

        for attempt in 1..=max_retries {
            match self.build_request(url, options).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        if attempt > 1 {
                            #[cfg(feature = "tracing")]
                            tracing::info!("request to {} succeeded after {} attempts", url, attempt);

                            self.emit(&FetchEvent::Recovered {
                                url: url.to_owned(),
                                attempts: attempt,
                            });
                        }
                        return Ok(response);
                    }

                    if status == StatusCode::UNAUTHORIZED && attempt < max_retries {
                        self.wait_before_retry(url, attempt, RetryReason::Unauthorized)
                            .await;
                        continue;
                    }

                    let err = FetchError::Http {
                        status: status.as_u16(),
                        status_text: status.canonical_reason().unwrap_or_default().to_owned(),
                    };
                    self.report_failure(url, attempt, &err);
                    return Err(err);
                }
                Err(err) => {
                    // Builder errors (bad header, bad URL) never reach the network.
                    if err.is_builder() || attempt >= max_retries {
                        let err = FetchError::Transport(err);
                        self.report_failure(url, attempt, &err);
                        return Err(err);
                    }
                    let reason = RetryReason::Network(err.to_string());
                    self.wait_before_retry(url, attempt, reason).await;
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            attempts: max_retries,
        })
    }

    fn build_request(&self, url: &str, options: &FetchOptions) -> reqwest::RequestBuilder {
        let mut request = self.http.request(options.effective_method(), url);

        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        request = match &options.body {
            Some(Body::Text(text)) => request.body(text.clone()),
            Some(Body::Json(json)) => request.json(json),
            None => request,
        };

        // On WASM, reqwest uses AbortController for timeout; the `.timeout()`
        // method is available on both targets.
        if let Some(timeout_ms) = options.timeout_ms {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }

        apply_credentials(request, options.effective_credentials())
    }

    /// Notifies subscribers, then waits `initial_delay_ms * attempt`.
    ///
    /// On native targets the wait is `tokio::time::sleep`; on WASM it is a
    /// `setTimeout`-backed future. Both yield to the event loop.
    async fn wait_before_retry(&self, url: &str, attempt: usize, reason: RetryReason) {
        let delay = self.policy.delay_for(attempt);

        #[cfg(feature = "tracing")]
        tracing::warn!(
            "retrying request to {} after {} ms (attempt {} failed: {})",
            url,
            delay.as_millis(),
            attempt,
            reason
        );

        self.emit(&FetchEvent::Retrying {
            url: url.to_owned(),
            attempt,
            delay,
            reason,
        });

        #[cfg(not(target_arch = "wasm32"))]
        sleep(delay).await;

        #[cfg(target_arch = "wasm32")]
        gloo_timers::future::TimeoutFuture::new(
            u32::try_from(delay.as_millis()).unwrap_or(u32::MAX),
        )
        .await;
    }

    fn report_failure(&self, url: &str, attempts: usize, err: &FetchError) {
        #[cfg(feature = "tracing")]
        tracing::error!("request to {} failed after {} attempts: {}", url, attempts, err);

        #[cfg(not(feature = "tracing"))]
        let _ = err;

        self.emit(&FetchEvent::Failed {
            url: url.to_owned(),
            attempts,
        });
    }

    fn emit(&self, event: &FetchEvent) {
        // Snapshot so callbacks may subscribe/unsubscribe without deadlocking.
        let callbacks: Vec<Callback> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn apply_credentials(
    request: reqwest::RequestBuilder,
    credentials: Credentials,
) -> reqwest::RequestBuilder {
    match credentials {
        Credentials::SameOrigin => request.fetch_credentials_same_origin(),
        Credentials::Include => request.fetch_credentials_include(),
        Credentials::Omit => request.fetch_credentials_omit(),
    }
}

// Native clients have no ambient cookie jar to scope.
#[cfg(not(target_arch = "wasm32"))]
fn apply_credentials(
    request: reqwest::RequestBuilder,
    _credentials: Credentials,
) -> reqwest::RequestBuilder {
    request
}
