// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! One-shot callback timers for the rate-limit operators.

use crate::timer::{DefaultTimer, Timer};
use rivulet_core::CancellationToken;
use std::time::Duration;

/// A cancelable timer that invokes a callback once after a duration.
///
/// Rate-limit operators start these lazily (on the first event of a period)
/// and null their handle when the timer fires. Dropping the handle cancels a
/// timer that has not fired yet, so replacing a stored `Option<OneShotTimer>`
/// discards the pending period.
#[derive(Debug)]
pub struct OneShotTimer {
    cancel: CancellationToken,
}

impl OneShotTimer {
    /// Start a timer firing `callback` after `duration`.
    pub fn start<F>(duration: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let timer = DefaultTimer::default();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = timer.sleep_future(duration) => {
                    if !token.is_cancelled() {
                        callback();
                    }
                }
            }
        });
        Self { cancel }
    }

    /// Cancel the timer; the callback will not run. Idempotent, and a no-op
    /// once the timer has fired.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
