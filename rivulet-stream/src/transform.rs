// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The handler-transformer primitive.
//!
//! Wraps a source stream with three pluggable handlers, each writing into
//! the output's shared sink. Most single-input operators reduce to this
//! primitive; the rest implement the subscription protocol directly.
//!
//! Contract:
//! - the source is subscribed on first listen of the output;
//! - each source event invokes its handler exactly once, regardless of how
//!   many listeners a broadcast output has;
//! - pause/resume on a single-subscription output delegate to the source;
//! - cancel cancels the source subscription and any extra teardown the
//!   operator registered;
//! - a broadcast output keeps its source subscription for the stream's
//!   lifetime, so stateful handlers survive listener churn.

use parking_lot::Mutex;
use rivulet_core::{
    join_cancels, CancelFuture, EventHandlers, EventSink, EventStream, OutputController,
    StreamError, Subscription,
};
use std::sync::Arc;

/// The three event handlers of a transformer.
///
/// Error and done handlers default to verbatim forwarding; the data handler
/// is always supplied (it is the one that changes the element type).
pub struct TransformHandlers<T, U> {
    pub(crate) on_data: Box<dyn FnMut(T, &EventSink<U>) + Send>,
    pub(crate) on_error: Box<dyn FnMut(StreamError, &EventSink<U>) + Send>,
    pub(crate) on_done: Box<dyn FnMut(&EventSink<U>) + Send>,
}

impl<T, U: Clone + Send + 'static> TransformHandlers<T, U> {
    /// Handlers with the given data handler and forwarding error/done.
    pub fn new(on_data: impl FnMut(T, &EventSink<U>) + Send + 'static) -> Self {
        Self {
            on_data: Box::new(on_data),
            on_error: Box::new(|e, sink| sink.add_error(e)),
            on_done: Box::new(|sink| sink.close()),
        }
    }

    /// Replace the error handler.
    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(StreamError, &EventSink<U>) + Send + 'static) -> Self {
        self.on_error = Box::new(f);
        self
    }

    /// Replace the done handler.
    #[must_use]
    pub fn on_done(mut self, f: impl FnMut(&EventSink<U>) + Send + 'static) -> Self {
        self.on_done = Box::new(f);
        self
    }
}

impl<T: Clone + Send + 'static> TransformHandlers<T, T> {
    /// Handlers that forward every event verbatim.
    #[must_use]
    pub fn forwarding() -> Self {
        Self::new(|v, sink| sink.add(v))
    }
}

/// Operator-specific teardown run when a single-subscription output is
/// canceled, in addition to canceling the source subscription.
pub type ExtraCancel = Box<dyn FnMut() -> CancelFuture + Send>;

/// Bind `handlers` to `source`, producing the transformed output stream.
pub fn transform_events<T, U>(
    source: EventStream<T>,
    handlers: TransformHandlers<T, U>,
) -> EventStream<U>
where
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
{
    transform_with(source, handlers, None)
}

/// [`transform_events`] with operator-specific teardown (timers, watchers)
/// run when a single-subscription output is canceled.
pub fn transform_with<T, U>(
    source: EventStream<T>,
    handlers: TransformHandlers<T, U>,
    extra_cancel: Option<ExtraCancel>,
) -> EventStream<U>
where
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
{
    let output = OutputController::new(source.is_broadcast());
    let sink = output.sink();
    let upstream: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    let listen_upstream = Arc::clone(&upstream);
    let mut pending = Some((source, handlers, sink));
    output.set_on_listen(move || {
        // Re-entered on every 0 -> 1 transition of a broadcast output; the
        // source is only subscribed the first time.
        let Some((source, handlers, sink)) = pending.take() else {
            return;
        };
        let TransformHandlers {
            mut on_data,
            mut on_error,
            mut on_done,
        } = handlers;
        let data_sink = sink.clone();
        let error_sink = sink.clone();
        let done_sink = sink;
        let subscription = source.listen(
            EventHandlers::new()
                .on_data(move |v| on_data(v, &data_sink))
                .on_error(move |e| on_error(e, &error_sink))
                .on_done(move || on_done(&done_sink)),
        );
        *listen_upstream.lock() = Some(subscription);
    });

    let pause_upstream = Arc::clone(&upstream);
    output.set_on_pause(move || {
        if let Some(subscription) = &*pause_upstream.lock() {
            subscription.pause();
        }
    });
    let resume_upstream = Arc::clone(&upstream);
    output.set_on_resume(move || {
        if let Some(subscription) = &*resume_upstream.lock() {
            subscription.resume();
        }
    });

    if !output.is_broadcast() {
        let cancel_upstream = Arc::clone(&upstream);
        let mut extra_cancel = extra_cancel;
        output.set_on_cancel(move || {
            let mut cancels = Vec::new();
            if let Some(subscription) = cancel_upstream.lock().take() {
                cancels.push(subscription.cancel());
            }
            if let Some(extra) = extra_cancel.as_mut() {
                cancels.push(extra());
            }
            join_cancels(cancels)
        });
    }

    output.stream()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivulet_core::BroadcastController;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn forwards_events_by_default() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        transform_events(
            EventStream::from_iter([1, 2, 3]),
            TransformHandlers::forwarding(),
        )
        .listen(EventHandlers::new().on_data(move |v: i32| sink.lock().push(v)));

        settle().await;
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn broadcast_handler_runs_once_per_event() {
        let controller = BroadcastController::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let doubled = transform_events(
            controller.stream(),
            TransformHandlers::new(move |v: i32, sink: &EventSink<i32>| {
                counter.fetch_add(1, Ordering::SeqCst);
                sink.add(v * 2);
            }),
        );

        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));
        let first_sink = Arc::clone(&first);
        let second_sink = Arc::clone(&second);
        doubled.listen(EventHandlers::new().on_data(move |v| first_sink.lock().push(v)));
        doubled.listen(EventHandlers::new().on_data(move |v| second_sink.lock().push(v)));

        controller.add(21);
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*first.lock(), vec![42]);
        assert_eq!(*second.lock(), vec![42]);
    }

    #[tokio::test]
    async fn cancel_propagates_to_the_source() {
        let controller = rivulet_core::StreamController::new();
        let canceled = Arc::new(AtomicUsize::new(0));
        let hook_count = Arc::clone(&canceled);
        controller.set_on_cancel(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
            rivulet_core::resolved_cancel()
        });

        let subscription = transform_events(controller.stream(), TransformHandlers::forwarding())
            .listen(EventHandlers::<i32>::new());
        settle().await;
        subscription.cancel().await.unwrap();
        assert_eq!(canceled.load(Ordering::SeqCst), 1);
    }
}
