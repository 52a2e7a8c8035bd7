// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Clock abstraction for timed operators.
pub trait Timer: Clone + Default + Send + Sync + 'static {
    type Sleep: Future<Output = ()> + Send;
    type Instant: Copy + Ord + std::fmt::Debug + Send + Sync;

    fn sleep_future(&self, duration: Duration) -> Self::Sleep;

    fn now(&self) -> Self::Instant;
}

/// The tokio clock. Respects `tokio::time::pause`/`advance` in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    type Sleep = Sleep;
    type Instant = tokio::time::Instant;

    fn sleep_future(&self, duration: Duration) -> Self::Sleep {
        Sleep {
            inner: tokio::time::sleep(duration),
        }
    }

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }
}

/// Default timer used by the timed operator crates.
pub type DefaultTimer = TokioTimer;

/// Future returned by [`TokioTimer::sleep_future`].
#[pin_project]
pub struct Sleep {
    #[pin]
    inner: tokio::time::Sleep,
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.project().inner.poll(cx)
    }
}
