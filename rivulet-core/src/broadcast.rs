// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Hot, multi-subscriber broadcast controller.
//!
//! A [`BroadcastController`] fans every event out to all current
//! subscribers. Late subscribers do not receive past events; events added
//! while nobody listens are dropped. Each subscriber has its own queue and
//! pause state, so pausing one listener never affects the others (or the
//! source).

use crate::event::{Event, EventHandlers};
use crate::subscriber::Subscriber;
use crate::subscription::{resolved_cancel, CancelFuture, Subscription};
use parking_lot::Mutex;
use rivulet_error::{Result, StreamError};
use std::collections::VecDeque;
use std::sync::Arc;

type ListenHook = Arc<Mutex<dyn FnMut() + Send>>;
type CancelHook = Arc<Mutex<dyn FnMut() -> CancelFuture + Send>>;

pub(crate) struct BroadcastShared<T> {
    state: Mutex<BroadcastState<T>>,
}

struct BroadcastState<T> {
    subscribers: Vec<Arc<Subscriber<T>>>,
    closed: bool,
    on_first_listen: Option<ListenHook>,
    on_last_cancel: Option<CancelHook>,
}

impl<T: Clone + Send + 'static> BroadcastShared<T> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BroadcastState {
                subscribers: Vec::new(),
                closed: false,
                on_first_listen: None,
                on_last_cancel: None,
            }),
        })
    }

    /// Fan an event out to every live subscriber.
    ///
    /// Events after `Done` are silently dropped; canceled subscribers are
    /// pruned lazily on each dispatch.
    pub(crate) fn dispatch(&self, event: Event<T>) {
        let targets = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.subscribers.retain(|s| !s.is_canceled());
            if event.is_done() {
                state.closed = true;
                std::mem::take(&mut state.subscribers)
            } else {
                state.subscribers.clone()
            }
        };
        for subscriber in &targets {
            subscriber.push(event.clone());
        }
    }

    /// Like [`dispatch`](Self::dispatch), but reports why a push went
    /// nowhere instead of dropping it silently.
    pub(crate) fn try_dispatch(&self, event: Event<T>) -> Result<()> {
        let targets = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(StreamError::Closed);
            }
            state.subscribers.retain(|s| !s.is_canceled());
            if state.subscribers.is_empty() {
                return Err(StreamError::ChannelSend);
            }
            state.subscribers.clone()
        };
        for subscriber in &targets {
            subscriber.push(event.clone());
        }
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock();
        state.subscribers.retain(|s| !s.is_canceled());
        state.subscribers.len()
    }

    pub(crate) fn try_listen(
        shared: &Arc<Self>,
        handlers: EventHandlers<T>,
    ) -> Result<Subscription> {
        let (subscriber, first_listen) = {
            let mut state = shared.state.lock();
            if state.closed {
                // A finished broadcast stream still accepts listeners; they
                // only observe Done.
                drop(state);
                let subscriber = Subscriber::new(VecDeque::from([Event::Done]));
                Subscriber::spawn_pump(&subscriber, handlers);
                return Ok(Subscription::detached());
            }
            state.subscribers.retain(|s| !s.is_canceled());
            let was_empty = state.subscribers.is_empty();
            let subscriber = Subscriber::new(VecDeque::new());
            state.subscribers.push(Arc::clone(&subscriber));
            let hook = if was_empty {
                state.on_first_listen.clone()
            } else {
                None
            };
            (subscriber, hook)
        };

        crate::trace!("broadcast stream gained a subscriber");
        Subscriber::spawn_pump(&subscriber, handlers);
        if let Some(hook) = first_listen {
            (&mut *hook.lock())();
        }

        let pause_target = Arc::clone(&subscriber);
        let resume_target = Arc::clone(&subscriber);
        let shared = Arc::clone(shared);
        Ok(Subscription::new(
            move || pause_target.pause(),
            move || resume_target.resume(),
            move || {
                subscriber.cancel();
                let last_cancel = {
                    let mut state = shared.state.lock();
                    state.subscribers.retain(|s| !s.is_canceled());
                    if state.subscribers.is_empty() && !state.closed {
                        state.on_last_cancel.clone()
                    } else {
                        None
                    }
                };
                match last_cancel {
                    Some(hook) => {
                        crate::trace!("broadcast stream lost its last subscriber");
                        (&mut *hook.lock())()
                    }
                    None => resolved_cancel(),
                }
            },
        ))
    }
}

/// The write end of a broadcast stream.
///
/// Every event is delivered to each subscriber active at dispatch time.
/// `T: Clone` because fan-out clones the event per subscriber.
pub struct BroadcastController<T> {
    shared: Arc<BroadcastShared<T>>,
}

impl<T: Clone + Send + 'static> BroadcastController<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: BroadcastShared::new(),
        }
    }

    /// Push a data event to all current subscribers.
    pub fn add(&self, value: T) {
        self.shared.dispatch(Event::Data(value));
    }

    /// Push a data event, reporting failure instead of dropping it.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Closed`] after `close`, and
    /// [`StreamError::ChannelSend`] when no live subscriber remains to
    /// receive the event.
    pub fn try_add(&self, value: T) -> Result<()> {
        self.shared.try_dispatch(Event::Data(value))
    }

    /// Push an error event to all current subscribers.
    pub fn add_error(&self, error: StreamError) {
        self.shared.dispatch(Event::Error(error));
    }

    /// Terminate the stream for all current and future subscribers.
    pub fn close(&self) {
        self.shared.dispatch(Event::Done);
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Number of live subscribers (canceled ones are pruned first).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscriber_count()
    }

    /// A cloneable write handle to this controller.
    #[must_use]
    pub fn sink(&self) -> crate::sink::EventSink<T> {
        crate::sink::EventSink::broadcast(Arc::clone(&self.shared))
    }

    /// The read end. Accepts any number of concurrent listeners.
    #[must_use]
    pub fn stream(&self) -> crate::stream::EventStream<T> {
        crate::stream::EventStream::from_broadcast(Arc::clone(&self.shared))
    }

    /// Hook invoked on every 0 → 1 subscriber transition.
    pub fn set_on_first_listen(&self, hook: impl FnMut() + Send + 'static) {
        self.shared.state.lock().on_first_listen = Some(Arc::new(Mutex::new(hook)));
    }

    /// Hook invoked on every 1 → 0 subscriber transition (before `close`);
    /// the returned future becomes the canceling subscription's completion.
    pub fn set_on_last_cancel(&self, hook: impl FnMut() -> CancelFuture + Send + 'static) {
        self.shared.state.lock().on_last_cancel = Some(Arc::new(Mutex::new(hook)));
    }
}

impl<T: Clone + Send + 'static> Default for BroadcastController<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BroadcastController<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    fn counting(count: &Arc<AtomicUsize>) -> EventHandlers<i32> {
        let count = Arc::clone(count);
        EventHandlers::new().on_data(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn fans_out_to_all_subscribers() {
        let controller = BroadcastController::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        controller.stream().listen(counting(&first));
        controller.stream().listen(counting(&second));

        controller.add(7);
        settle().await;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn events_without_subscribers_are_dropped() {
        let controller = BroadcastController::new();
        controller.add(1);

        let count = Arc::new(AtomicUsize::new(0));
        controller.stream().listen(counting(&count));
        controller.add(2);

        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn paused_subscriber_buffers_while_others_flow() {
        let controller = BroadcastController::new();
        let paused = Arc::new(AtomicUsize::new(0));
        let live = Arc::new(AtomicUsize::new(0));
        let paused_sub = controller.stream().listen(counting(&paused));
        controller.stream().listen(counting(&live));

        paused_sub.pause();
        controller.add(1);
        controller.add(2);
        settle().await;
        assert_eq!(paused.load(Ordering::SeqCst), 0);
        assert_eq!(live.load(Ordering::SeqCst), 2);

        paused_sub.resume();
        settle().await;
        assert_eq!(paused.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn try_add_requires_a_live_subscriber() {
        let controller = BroadcastController::new();
        assert!(matches!(
            controller.try_add(1),
            Err(StreamError::ChannelSend)
        ));

        let subscription = controller.stream().listen(counting(&Arc::new(AtomicUsize::new(0))));
        assert!(controller.try_add(2).is_ok());

        subscription.cancel().await.unwrap();
        assert!(matches!(
            controller.try_add(3),
            Err(StreamError::ChannelSend)
        ));

        controller.close();
        assert!(matches!(controller.try_add(4), Err(StreamError::Closed)));
    }

    #[tokio::test]
    async fn listen_after_close_sees_done_immediately() {
        let controller = BroadcastController::<i32>::new();
        controller.close();

        let done = Arc::new(AtomicUsize::new(0));
        let done_count = Arc::clone(&done);
        controller.stream().listen(EventHandlers::new().on_done(move || {
            done_count.fetch_add(1, Ordering::SeqCst);
        }));

        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_listen_and_last_cancel_hooks_fire_per_transition() {
        let controller = BroadcastController::<i32>::new();
        let listens = Arc::new(AtomicUsize::new(0));
        let cancels = Arc::new(AtomicUsize::new(0));
        let listen_count = Arc::clone(&listens);
        let cancel_count = Arc::clone(&cancels);
        controller.set_on_first_listen(move || {
            listen_count.fetch_add(1, Ordering::SeqCst);
        });
        controller.set_on_last_cancel(move || {
            cancel_count.fetch_add(1, Ordering::SeqCst);
            resolved_cancel()
        });

        let a = controller.stream().listen(EventHandlers::new());
        let b = controller.stream().listen(EventHandlers::new());
        a.cancel().await.unwrap();
        assert_eq!(cancels.load(Ordering::SeqCst), 0);
        b.cancel().await.unwrap();
        assert_eq!(cancels.load(Ordering::SeqCst), 1);

        controller.stream().listen(EventHandlers::new());
        assert_eq!(listens.load(Ordering::SeqCst), 2);
    }
}
