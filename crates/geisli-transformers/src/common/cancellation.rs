//! Cooperative cancellation for decode calls
//!
//! The decoder polls its token once per step boundary. A cancelled decode is
//! not an error: it returns the hypotheses gathered so far.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Checked by the decoder before each step.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Creates a token and the handle that cancels it.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let (token, handle) = CancellationToken::new();
    ///
    /// let decode = decode(&scorer, &config, &pipeline, selection, &token);
    ///
    /// // from another task
    /// handle.cancel();
    /// ```
    pub fn new() -> (Self, CancellationHandle) {
        let cancelled = Arc::new(AtomicBool::new(false));
        let token = CancellationToken {
            cancelled: cancelled.clone(),
            deadline: None,
        };
        (token, CancellationHandle { cancelled })
    }

    /// A token that is never cancelled.
    pub fn never() -> Self {
        CancellationToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// A token that is already cancelled.
    pub fn already_cancelled() -> Self {
        CancellationToken {
            cancelled: Arc::new(AtomicBool::new(true)),
            deadline: None,
        }
    }

    /// Returns a copy of this token that also reports cancellation once
    /// `timeout` has elapsed from now.
    ///
    /// Unlike [`CancellationHandle::cancel_after`] this needs no runtime.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Returns an error if cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<(), CancellationError> {
        if self.is_cancelled() {
            Err(CancellationError)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::never()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Triggers cancellation of every token created alongside it.
#[derive(Clone)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Cancels from a background tokio task after `timeout`.
    pub fn cancel_after(self, timeout: Duration) {
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            self.cancel();
        });
    }
}

impl std::fmt::Debug for CancellationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Returned by [`CancellationToken::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationError;

impl std::fmt::Display for CancellationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "decode was cancelled")
    }
}

impl std::error::Error for CancellationError {}

#[cfg(test)]
mod cancellation_tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_token_crosses_threads() {
        let (token, handle) = CancellationToken::new();

        let waiter = thread::spawn(move || {
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            token.is_cancelled()
        });

        thread::sleep(Duration::from_millis(20));
        handle.cancel();

        assert!(waiter.join().unwrap());
    }

    #[tokio::test]
    async fn test_cancel_after() {
        let (token, handle) = CancellationToken::new();
        handle.cancel_after(Duration::from_millis(20));

        assert!(!token.is_cancelled());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_with_timeout_expires() {
        let token = CancellationToken::never().with_timeout(Duration::from_millis(10));
        assert!(!token.is_cancelled());
        thread::sleep(Duration::from_millis(30));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_zero_timeout_is_cancelled_immediately() {
        let token = CancellationToken::never().with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cloned_tokens_share_state() {
        let (token1, handle) = CancellationToken::new();
        let token2 = token1.clone();

        handle.cancel();
        handle.cancel();

        assert!(token1.is_cancelled());
        assert!(token2.is_cancelled());
    }

    #[test]
    fn test_never_and_already_cancelled() {
        assert!(!CancellationToken::never().is_cancelled());
        assert!(CancellationToken::already_cancelled().is_cancelled());
        assert!(!CancellationToken::default().is_cancelled());
    }

    #[test]
    fn test_check() {
        let (token, handle) = CancellationToken::new();
        assert!(token.check().is_ok());
        handle.cancel();
        assert_eq!(token.check(), Err(CancellationError));
    }
}
