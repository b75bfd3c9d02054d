//! Server pacing hints parsed from response headers.
//!
//! The client never retries a call by itself: not every operation is safe to
//! repeat (batch creation, for one). Callers that do retry can use
//! [`RetryHint`] to wait as long as the server asked.

use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Pacing information carried by an unexpected response, typically a 429 or 503.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryHint {
    /// Explicit wait requested via `Retry-After` (seconds or HTTP date).
    pub retry_after: Option<Duration>,

    /// When the current rate limit window resets
    /// (`X-RateLimit-Reset` or `RateLimit-Reset`, Unix seconds).
    pub reset_at: Option<SystemTime>,

    /// Requests left in the current window (`X-RateLimit-Remaining`).
    pub remaining: Option<u64>,
}

impl RetryHint {
    /// Extracts the hint from response headers. Missing or malformed headers are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use xms::RetryHint;
    /// use http::HeaderMap;
    /// use std::time::Duration;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("retry-after", "60".parse().unwrap());
    ///
    /// let hint = RetryHint::from_headers(&headers);
    /// assert_eq!(hint.retry_after, Some(Duration::from_secs(60)));
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            retry_after: retry_after(headers),
            reset_at: reset_at(headers),
            remaining: header_str(headers, "x-ratelimit-remaining").and_then(|v| v.parse().ok()),
        }
    }

    /// Returns `true` if the server signalled that the caller should slow down.
    pub fn is_throttled(&self) -> bool {
        self.retry_after.is_some() || self.remaining == Some(0)
    }

    /// The suggested wait before trying again, capped at `max_wait`.
    ///
    /// `Retry-After` wins over the reset time. Returns `None` when the
    /// response carried no usable hint.
    pub fn delay(&self, max_wait: Duration) -> Option<Duration> {
        if let Some(retry_after) = self.retry_after {
            return Some(retry_after.min(max_wait));
        }

        let until_reset = self.reset_at?.duration_since(SystemTime::now()).ok()?;
        Some(until_reset.min(max_wait))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = header_str(headers, "retry-after")?;

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = httpdate::parse_http_date(value).ok()?;
    at.duration_since(SystemTime::now()).ok()
}

fn reset_at(headers: &HeaderMap) -> Option<SystemTime> {
    ["x-ratelimit-reset", "ratelimit-reset"]
        .iter()
        .filter_map(|name| header_str(headers, name))
        .find_map(|value| value.parse::<u64>().ok())
        .map(|seconds| UNIX_EPOCH + Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("60"));

        let hint = RetryHint::from_headers(&headers);
        assert_eq!(hint.retry_after, Some(Duration::from_secs(60)));
        assert!(hint.is_throttled());
    }

    #[test]
    fn test_retry_after_http_date() {
        let at = SystemTime::now() + Duration::from_secs(120);
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_str(&httpdate::fmt_http_date(at)).unwrap(),
        );

        let delay = RetryHint::from_headers(&headers).retry_after.unwrap();
        assert!(delay > Duration::from_secs(100) && delay <= Duration::from_secs(120));
    }

    #[test]
    fn test_reset_and_remaining() {
        let reset = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 30;
        let mut headers = HeaderMap::new();
        headers.insert(
            "ratelimit-reset",
            HeaderValue::from_str(&reset.to_string()).unwrap(),
        );
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));

        let hint = RetryHint::from_headers(&headers);
        assert!(hint.reset_at.is_some());
        assert_eq!(hint.remaining, Some(0));
        assert!(hint.is_throttled());

        let delay = hint.delay(Duration::from_secs(300)).unwrap();
        assert!(delay <= Duration::from_secs(30));
    }

    #[test]
    fn test_delay_capped_by_max_wait() {
        let hint = RetryHint {
            retry_after: Some(Duration::from_secs(600)),
            ..Default::default()
        };

        assert_eq!(
            hint.delay(Duration::from_secs(300)),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_no_headers_no_hint() {
        let hint = RetryHint::from_headers(&HeaderMap::new());
        assert_eq!(hint, RetryHint::default());
        assert!(!hint.is_throttled());
        assert_eq!(hint.delay(Duration::from_secs(10)), None);
    }
}
