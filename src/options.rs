use std::time::Duration;

use reqwest::Method;

/// Attempt budget and linear backoff for [`crate::RetryingFetcher`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Never below 1.
    pub max_retries: usize,
    /// Base backoff in milliseconds; retry `k` waits `initial_delay_ms * k`.
    pub initial_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Builds a policy. A `max_retries` of 0 is raised to 1.
    pub fn new(max_retries: usize, initial_delay_ms: u64) -> Self {
        Self {
            max_retries: max_retries.max(1),
            initial_delay_ms,
        }
    }

    /// Delay inserted after the failed 1-based `attempt`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = u64::try_from(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.initial_delay_ms.saturating_mul(factor))
    }

    /// Reads the policy from environment variables.
    ///
    /// Reads:
    /// - `PAGEKIT_MAX_RETRIES`: total attempts (default `3`)
    /// - `PAGEKIT_RETRY_DELAY_MS`: base backoff in milliseconds (default `1000`)
    ///
    /// Unset variables keep their defaults; set but unparsable values are an error.
    ///
    /// **Not available on `wasm32` targets.**
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> std::result::Result<Self, String> {
        let defaults = Self::default();
        let max_retries = read_env_number("PAGEKIT_MAX_RETRIES")?
            .map(|value| usize::try_from(value).unwrap_or(usize::MAX))
            .unwrap_or(defaults.max_retries);
        let initial_delay_ms =
            read_env_number("PAGEKIT_RETRY_DELAY_MS")?.unwrap_or(defaults.initial_delay_ms);
        Ok(Self::new(max_retries, initial_delay_ms))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_env_number(name: &str) -> std::result::Result<Option<u64>, String> {
    match std::env::var(name) {
        Ok(raw) => parse_number(name, &raw).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(format!("{name} is not valid unicode")),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn parse_number(name: &str, raw: &str) -> std::result::Result<u64, String> {
    raw.trim()
        .parse::<u64>()
        .map_err(|err| format!("{name} must be a non-negative integer, got '{raw}': {err}"))
}

/// Fetch credentials mode.
///
/// Maps onto the browser Fetch API on `wasm32`. Native targets carry no
/// ambient cookies, so the mode has no effect there.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Credentials {
    /// Send cookies only to the same origin.
    #[default]
    SameOrigin,
    /// Always send cookies.
    Include,
    /// Never send cookies.
    Omit,
}

/// Request body carried by [`FetchOptions`].
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Text(String),
    Json(serde_json::Value),
}

/// Caller-supplied request options.
///
/// Every field set here overrides the default. Credentials fall back to
/// [`Credentials::SameOrigin`] unless set explicitly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchOptions {
    /// HTTP method; `GET` when unset.
    pub method: Option<Method>,
    /// Extra headers, sent in order.
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub credentials: Option<Credentials>,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Body::Text(body.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub(crate) fn effective_method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }

    pub(crate) fn effective_credentials(&self) -> Credentials {
        self.credentials.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::Method;

    use super::{parse_number, Credentials, FetchOptions, RetryPolicy};

    #[test]
    fn default_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay_ms, 1_000);
    }

    #[test]
    fn zero_attempts_is_raised_to_one() {
        assert_eq!(RetryPolicy::new(0, 10).max_retries, 1);
    }

    #[test]
    fn backoff_is_linear_in_attempt_index() {
        let policy = RetryPolicy::new(5, 250);
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(2), Duration::from_millis(500));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1_000));
    }

    #[test]
    fn backoff_saturates() {
        let policy = RetryPolicy::new(2, u64::MAX);
        assert_eq!(policy.delay_for(3), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn credentials_default_to_same_origin_unless_overridden() {
        let defaults = FetchOptions::new().method(Method::POST);
        assert_eq!(defaults.effective_credentials(), Credentials::SameOrigin);
        assert_eq!(defaults.effective_method(), Method::POST);

        let include = FetchOptions::new().credentials(Credentials::Include);
        assert_eq!(include.effective_credentials(), Credentials::Include);
        assert_eq!(include.effective_method(), Method::GET);
    }

    #[test]
    fn env_number_parsing_rejects_garbage() {
        assert_eq!(parse_number("X", " 42 "), Ok(42));
        assert!(parse_number("X", "-1").is_err());
        assert!(parse_number("X", "many").is_err());
    }
}
