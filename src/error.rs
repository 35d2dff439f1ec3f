/// Error type returned by [`crate::fetch_with_retry`] and [`crate::RetryingFetcher`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network or request execution error from `reqwest`, passed through unchanged.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status that is not retried (or a 401 on the last attempt).
    #[error("http error {status}: {status_text}")]
    Http {
        /// Numeric status code.
        status: u16,
        /// Canonical reason phrase, empty when the code has none.
        status_text: String,
    },
    /// Retry loop finished without producing a response or an error.
    ///
    /// Unreachable while `max_retries >= 1`; kept as an invariant safeguard.
    #[error("max retries exceeded after {attempts} attempts")]
    RetriesExhausted { attempts: usize },
}

impl FetchError {
    /// Returns the HTTP status code for [`FetchError::Http`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            Self::RetriesExhausted { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FetchError;

    #[test]
    fn http_error_message_carries_status_and_text() {
        let err = FetchError::Http {
            status: 403,
            status_text: "Forbidden".to_owned(),
        };
        assert_eq!(err.to_string(), "http error 403: Forbidden");
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn exhausted_has_no_status() {
        let err = FetchError::RetriesExhausted { attempts: 3 };
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("3 attempts"));
    }
}
