//! Cancellation token threaded from the build command down to protocol handlers
//!
//! A token is cancelled either explicitly through [`Cancellation::cancel`]
//! (SIGINT/SIGTERM via [`install_signal_handler`]) or implicitly once its
//! deadline passes. Clones share the same flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// Token that is only cancelled explicitly
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that cancels itself after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether [`Cancellation::cancel`] was called, ignoring the deadline
    fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline, `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// Cancel `token` on SIGINT or SIGTERM so in-flight fetches unwind and
/// release their workspaces. A second signal exits immediately.
pub fn install_signal_handler(token: &Cancellation) {
    let token = token.clone();
    let installed = ctrlc::set_handler(move || {
        if token.is_interrupted() {
            std::process::exit(130);
        }
        tracing::warn!("interrupted, cancelling the build (repeat to exit now)");
        token.cancel();
    });

    if let Err(e) = installed {
        tracing::warn!(error = %e, "failed to install signal handler");
    }
}
