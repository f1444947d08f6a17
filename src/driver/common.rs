//! Common utilities shared across backends and page objects
//!
//! Polling primitives and text escaping for device shells.

use crate::error::PollTimeout;
use anyhow::Result;
use std::future::Future;
use std::time::{Duration, Instant};

// ============================================================================
// Polling Utilities
// ============================================================================

/// Bounded-attempt polling
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub max_attempts: u32,
    /// Pause between failed attempts
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(5),
        }
    }
}

/// Successful poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Number of checks performed, including the successful one
    pub attempts: u32,
}

/// Run `check` until it reports `true`, at most `config.max_attempts` times.
///
/// An error from `check` aborts the poll and is returned as-is. When every
/// attempt reports `false` the result is `Ok(Err(PollTimeout))` so callers
/// can turn the timeout into their own failure message.
pub async fn poll_until<F, Fut>(
    mut check: F,
    config: &PollConfig,
) -> Result<std::result::Result<PollOutcome, PollTimeout>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 1..=config.max_attempts {
        if check().await? {
            return Ok(Ok(PollOutcome { attempts: attempt }));
        }
        log::debug!("Poll attempt {}/{} not satisfied", attempt, config.max_attempts);

        if attempt < config.max_attempts && !config.interval.is_zero() {
            tokio::time::sleep(config.interval).await;
        }
    }

    Ok(Err(PollTimeout {
        attempts: config.max_attempts,
    }))
}

/// Time-bounded polling with backoff, used by backends for element waits
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    pub timeout: Duration,
    /// First pause; grows by half after each miss up to `max_interval`
    pub interval: Duration,
    pub max_interval: Duration,
}

impl WaitConfig {
    pub fn within(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(300),
            max_interval: Duration::from_millis(1000),
        }
    }
}

/// Calls `check_fn` until it returns `true` or the timeout passes.
/// The check always runs at least once.
pub async fn wait_until<F, Fut>(check_fn: F, config: WaitConfig) -> Result<bool>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let mut interval = config.interval;

    loop {
        if check_fn().await? {
            return Ok(true);
        }
        if start.elapsed() >= config.timeout {
            return Ok(false);
        }
        tokio::time::sleep(interval).await;
        interval = (interval * 3 / 2).min(config.max_interval);
    }
}

/// Escape text for `adb shell input text`; spaces become `%s`
pub fn escape_for_android_shell(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' ' => out.push_str("%s"),
            '\\' | '"' | '\'' | '&' | '<' | '>' | '|' | ';' | '(' | ')' | '$' | '`' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> PollConfig {
        PollConfig {
            max_attempts,
            interval: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_poll_succeeds_on_third_check() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = poll_until(
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(n >= 3)
            },
            &quick(5),
        )
        .await
        .unwrap();

        assert_eq!(result, Ok(PollOutcome { attempts: 3 }));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_times_out_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = poll_until(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            },
            &quick(5),
        )
        .await
        .unwrap();

        assert_eq!(result, Err(PollTimeout { attempts: 5 }));
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_poll_error_aborts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = poll_until(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<bool, _>(anyhow::anyhow!("device gone"))
            },
            &quick(5),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_until_times_out() {
        let config = WaitConfig {
            timeout: Duration::from_millis(30),
            interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(10),
        };
        let met = wait_until(|| async { Ok(false) }, config).await.unwrap();
        assert!(!met);

        let met = wait_until(|| async { Ok(true) }, WaitConfig::within(0)).await.unwrap();
        assert!(met);
    }

    #[test]
    fn test_escape_android_shell() {
        assert_eq!(escape_for_android_shell("hello world"), "hello%sworld");
        assert_eq!(escape_for_android_shell("a&b"), "a\\&b");
        assert_eq!(escape_for_android_shell("say \"hi\" (now)"), "say%s\\\"hi\\\"%s\\(now\\)");
    }
}
