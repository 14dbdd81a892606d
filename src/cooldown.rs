// SPDX-License-Identifier: MIT
//! Explicit timer state for cooldowns and debounced work.
//!
//! Monotonic clock reads instead of nested timeout callbacks: a [`Cooldown`]
//! is a value you can query, a [`Debounce`] is a cancellable scheduled task.
//! Used for the loot-roll cooldown and the toggle confirmation debounce.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

/// A fixed-length cooldown anchored to a monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct Cooldown {
    started: Instant,
    duration: Duration,
}

impl Cooldown {
    pub fn start(duration: Duration) -> Self {
        Self {
            started: Instant::now(),
            duration,
        }
    }

    /// Resume a cooldown of which `elapsed` has already passed, e.g.
    /// reconstructed from a persisted timestamp.
    pub fn resumed(duration: Duration, elapsed: Duration) -> Self {
        let started = Instant::now()
            .checked_sub(elapsed)
            .unwrap_or_else(Instant::now);
        Self { started, duration }
    }

    pub fn ready(&self) -> bool {
        self.started.elapsed() >= self.duration
    }

    /// Time left until the cooldown expires; zero once it has.
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.started.elapsed())
    }
}

/// A single-slot debouncer: scheduling new work cancels whatever was
/// pending. Dropping the debouncer cancels the pending task outright.
#[derive(Default)]
pub struct Debounce {
    pending: Option<JoinHandle<()>>,
}

impl Debounce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `work` to run after `delay`, replacing any pending run.
    pub fn schedule<F, Fut>(&mut self, delay: Duration, work: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work().await;
        }));
    }

    /// Abort the pending run, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Wait for the pending run to finish (used by flows that must observe
    /// the debounced effect before returning).
    pub async fn flush(&mut self) {
        if let Some(handle) = self.pending.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Debounce {
    fn drop(&mut self) {
        self.cancel();
    }
}
