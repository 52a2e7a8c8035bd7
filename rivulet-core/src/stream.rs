// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The user-facing stream handle and its source constructors.

use crate::broadcast::{BroadcastController, BroadcastShared};
use crate::controller::{SingleShared, StreamController};
use crate::event::EventHandlers;
use crate::subscription::{resolved_cancel, Subscription};
use futures::StreamExt;
use rivulet_error::Result;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// Where a stream's events come from. Implemented by both controller kinds.
pub(crate) trait Listenable<T>: Send + Sync {
    fn is_broadcast(&self) -> bool;
    fn try_listen(&self, handlers: EventHandlers<T>) -> Result<Subscription>;
}

struct SingleSource<T>(Arc<SingleShared<T>>);

impl<T: Clone + Send + 'static> Listenable<T> for SingleSource<T> {
    fn is_broadcast(&self) -> bool {
        false
    }

    fn try_listen(&self, handlers: EventHandlers<T>) -> Result<Subscription> {
        self.0.try_listen(handlers)
    }
}

struct BroadcastSource<T>(Arc<BroadcastShared<T>>);

impl<T: Clone + Send + 'static> Listenable<T> for BroadcastSource<T> {
    fn is_broadcast(&self) -> bool {
        true
    }

    fn try_listen(&self, handlers: EventHandlers<T>) -> Result<Subscription> {
        BroadcastShared::try_listen(&self.0, handlers)
    }
}

/// An ordered asynchronous sequence of data and error events terminated by
/// at most one done event.
///
/// A stream is either **single-subscription** (one listener for its
/// lifetime, pausable at the source) or **broadcast** (any number of
/// concurrent listeners, fan-out, pause only buffers the pausing listener).
/// The flag is fixed at construction and every operator's output mirrors
/// its primary input.
///
/// Cloning an `EventStream` clones the *handle*, not the stream: all clones
/// share one source, and for single-subscription streams a listen through
/// any clone consumes the stream's only subscription.
pub struct EventStream<T> {
    source: Arc<dyn Listenable<T>>,
}

impl<T: Clone + Send + 'static> EventStream<T> {
    pub(crate) fn from_single(shared: Arc<SingleShared<T>>) -> Self {
        Self {
            source: Arc::new(SingleSource(shared)),
        }
    }

    pub(crate) fn from_broadcast(shared: Arc<BroadcastShared<T>>) -> Self {
        Self {
            source: Arc::new(BroadcastSource(shared)),
        }
    }

    /// Whether this stream fans out to multiple listeners.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.source.is_broadcast()
    }

    /// Attach a listener.
    ///
    /// # Panics
    ///
    /// Panics if the stream is single-subscription and already has (or has
    /// had) a listener. Use [`try_listen`](Self::try_listen) to handle that
    /// case as an error.
    pub fn listen(&self, handlers: EventHandlers<T>) -> Subscription {
        match self.try_listen(handlers) {
            Ok(subscription) => subscription,
            Err(e) => panic!("stream cannot accept another listener: {e}"),
        }
    }

    /// Attach a listener, reporting `AlreadyListened` instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::AlreadyListened`](rivulet_error::StreamError)
    /// for a second listen on a single-subscription stream.
    pub fn try_listen(&self, handlers: EventHandlers<T>) -> Result<Subscription> {
        self.source.try_listen(handlers)
    }

    /// A single-subscription stream that replays `iter`'s items, then closes.
    ///
    /// Items are buffered up front and delivered through the normal pump, so
    /// pausing the subscription stops delivery mid-iteration.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let controller = StreamController::new();
        for value in iter {
            controller.add(value);
        }
        controller.close();
        controller.stream()
    }

    /// A single-subscription stream driven by any [`futures::Stream`].
    ///
    /// The source is not polled until the stream is listened to; canceling
    /// the subscription stops the forwarder and drops the source.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = T> + Send + 'static,
    {
        let controller = StreamController::new();
        let sink = controller.sink();
        let token = CancellationToken::new();
        let forward_token = token.clone();
        controller.set_on_listen(move || {
            let mut stream = Box::pin(stream);
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = forward_token.cancelled() => break,
                        item = stream.next() => match item {
                            Some(value) => sink.add(value),
                            None => {
                                sink.close();
                                break;
                            }
                        },
                    }
                }
            });
        });
        controller.set_on_cancel(move || {
            token.cancel();
            resolved_cancel()
        });
        controller.stream()
    }

    /// A single-subscription stream fed by a tokio unbounded channel.
    ///
    /// The most common production constructor: values pushed from other
    /// tasks become stream events.
    #[must_use]
    pub fn from_channel(receiver: tokio::sync::mpsc::UnboundedReceiver<T>) -> Self {
        Self::from_stream(UnboundedReceiverStream::new(receiver))
    }

    /// A stream that closes immediately without emitting.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_iter(std::iter::empty())
    }

    /// A stream that emits `value`, then closes.
    #[must_use]
    pub fn once(value: T) -> Self {
        Self::from_iter(std::iter::once(value))
    }

    /// A stream that never emits and never closes.
    #[must_use]
    pub fn never() -> Self {
        StreamController::new().stream()
    }

    /// Convert this stream into a broadcast stream.
    ///
    /// Returns `self` unchanged if it already is one. Otherwise the source
    /// is listened to on the first subscriber and stays subscribed for the
    /// stream's lifetime; events arriving while nobody listens are dropped.
    #[must_use]
    pub fn into_broadcast(self) -> Self {
        if self.is_broadcast() {
            return self;
        }
        let controller = BroadcastController::new();
        let sink = controller.sink();
        let mut upstream = Some(self);
        controller.set_on_first_listen(move || {
            // Single-subscription upstream: subscribe once, keep it for good.
            if let Some(source) = upstream.take() {
                let data_sink = sink.clone();
                let error_sink = sink.clone();
                let done_sink = sink.clone();
                source.listen(
                    EventHandlers::new()
                        .on_data(move |v| data_sink.add(v))
                        .on_error(move |e| error_sink.add_error(e))
                        .on_done(move || done_sink.close()),
                );
            }
        });
        controller.stream()
    }
}

impl<T> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    fn recording(seen: &Arc<Mutex<Vec<i32>>>, done: &Arc<AtomicBool>) -> EventHandlers<i32> {
        let seen = Arc::clone(seen);
        let done = Arc::clone(done);
        EventHandlers::new()
            .on_data(move |v| seen.lock().push(v))
            .on_done(move || done.store(true, Ordering::SeqCst))
    }

    #[tokio::test]
    async fn from_iter_replays_items_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(AtomicBool::new(false));
        EventStream::from_iter([1, 2, 3]).listen(recording(&seen, &done));

        settle().await;
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn from_channel_forwards_pushed_values() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(AtomicBool::new(false));
        EventStream::from_channel(rx).listen(recording(&seen, &done));

        tx.send(10).unwrap();
        tx.send(20).unwrap();
        settle().await;
        assert_eq!(*seen.lock(), vec![10, 20]);
        assert!(!done.load(Ordering::SeqCst));

        drop(tx);
        settle().await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn into_broadcast_fans_out_single_source() {
        let stream = EventStream::from_iter([1, 2]).into_broadcast();
        assert!(stream.is_broadcast());

        let seen_a = Arc::new(Mutex::new(Vec::new()));
        let seen_b = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(AtomicBool::new(false));
        stream.listen(recording(&seen_a, &done));
        stream.listen(recording(&seen_b, &done));

        settle().await;
        // Both listeners were attached before the upstream pump ran, so both
        // observe the full replay.
        assert_eq!(*seen_a.lock(), vec![1, 2]);
        assert_eq!(*seen_b.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn pause_buffers_iterated_items() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(AtomicBool::new(false));
        let subscription =
            EventStream::from_iter([1, 2, 3]).listen(recording(&seen, &done));

        subscription.pause();
        settle().await;
        assert!(seen.lock().is_empty());

        subscription.resume();
        settle().await;
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }
}
