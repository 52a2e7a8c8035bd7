// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use rivulet_error::Result;
use std::sync::Arc;

/// Async completion of a [`Subscription::cancel`] call.
///
/// Resolves once every upstream cancellation held by the subscription has
/// resolved; cancel-time errors are aggregated into the result.
pub type CancelFuture = BoxFuture<'static, Result<()>>;

/// A resolved `CancelFuture` for subscriptions with nothing to tear down.
#[must_use]
pub fn resolved_cancel() -> CancelFuture {
    futures::future::ready(Ok(())).boxed()
}

/// Aggregate several upstream cancel completions into one.
///
/// The combined future resolves only after every input has resolved; errors
/// are collected with [`StreamError::aggregate`](rivulet_error::StreamError).
#[must_use]
pub fn join_cancels(cancels: Vec<CancelFuture>) -> CancelFuture {
    if cancels.is_empty() {
        return resolved_cancel();
    }
    async move {
        let errors: Vec<_> = futures::future::join_all(cancels)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(rivulet_error::StreamError::aggregate(errors))
        }
    }
    .boxed()
}

type CancelHook = Box<dyn FnOnce() -> CancelFuture + Send>;

/// A handle to an active listener on a stream.
///
/// Dropping a subscription does *not* cancel it; call
/// [`cancel`](Subscription::cancel) (and await the returned future if you
/// need teardown to finish) to detach from the source.
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

struct SubscriptionInner {
    pause: Box<dyn Fn() + Send + Sync>,
    resume: Box<dyn Fn() + Send + Sync>,
    cancel: Mutex<Option<CancelHook>>,
}

impl Subscription {
    pub(crate) fn new(
        pause: impl Fn() + Send + Sync + 'static,
        resume: impl Fn() + Send + Sync + 'static,
        cancel: impl FnOnce() -> CancelFuture + Send + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                pause: Box::new(pause),
                resume: Box::new(resume),
                cancel: Mutex::new(Some(Box::new(cancel))),
            }),
        }
    }

    /// A subscription that controls nothing (already-done sources).
    pub(crate) fn detached() -> Self {
        Self::new(|| {}, || {}, resolved_cancel)
    }

    /// Request that event delivery stop until [`resume`](Self::resume).
    ///
    /// Pauses nest: `n` pauses need `n` resumes. On a single-subscription
    /// stream the request propagates to the source; on a broadcast stream it
    /// only buffers this listener's delivery.
    pub fn pause(&self) {
        (self.inner.pause)();
    }

    /// Undo one [`pause`](Self::pause).
    pub fn resume(&self) {
        (self.inner.resume)();
    }

    /// Cancel the subscription.
    ///
    /// Nothing is delivered after this call returns. The returned future
    /// resolves once all upstream teardown has completed; canceling twice
    /// yields an immediately-resolved future.
    pub fn cancel(&self) -> CancelFuture {
        let hook = self.inner.cancel.lock().take();
        match hook {
            Some(hook) => hook(),
            None => resolved_cancel(),
        }
    }
}

impl Clone for Subscription {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivulet_error::StreamError;

    #[tokio::test]
    async fn cancel_runs_hook_once() {
        let subscription = Subscription::new(
            || {},
            || {},
            || futures::future::ready(Err(StreamError::Closed)).boxed(),
        );

        assert!(subscription.cancel().await.is_err());
        // Second cancel resolves cleanly without re-running the hook.
        assert!(subscription.cancel().await.is_ok());
    }

    #[tokio::test]
    async fn join_cancels_aggregates_errors() {
        let joined = join_cancels(vec![
            resolved_cancel(),
            futures::future::ready(Err(StreamError::Closed)).boxed(),
        ]);
        assert!(joined.await.is_err());
    }
}
