// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rivulet_core::{
    join_cancels, EventHandlers, EventSink, EventStream, OutputController, Subscription,
};
use std::sync::Arc;

struct ConcatShared<T> {
    state: Mutex<ConcatState>,
    next: Mutex<Option<EventStream<T>>>,
}

struct ConcatState {
    current: Option<Subscription>,
    deferred_next: bool,
    pause_depth: usize,
}

impl<T: Clone + Send + 'static> ConcatShared<T> {
    /// Attach to the second stream, honoring any outstanding pauses.
    fn subscribe_next(shared: &Arc<Self>, sink: &EventSink<T>) {
        let Some(next) = shared.next.lock().take() else {
            return;
        };
        let data_sink = sink.clone();
        let error_sink = sink.clone();
        let done_sink = sink.clone();
        let subscription = next.listen(
            EventHandlers::new()
                .on_data(move |v| data_sink.add(v))
                .on_error(move |e| error_sink.add_error(e))
                .on_done(move || done_sink.close()),
        );
        let mut state = shared.state.lock();
        for _ in 0..state.pause_depth {
            subscription.pause();
        }
        state.current = Some(subscription);
    }
}

/// Extension trait providing the [`followed_by`](FollowedByExt::followed_by)
/// operator.
pub trait FollowedByExt<T>
where
    T: Clone + Send + 'static,
{
    /// Emits all events of this stream, then all events of `next`.
    ///
    /// `next` is subscribed only when this stream closes. If the output is
    /// paused at the switchover and `next` is broadcast, the subscription is
    /// delayed until resume so no broadcast events pile up; a paused
    /// single-subscription `next` is subscribed immediately and paused at
    /// its source.
    fn followed_by(self, next: EventStream<T>) -> EventStream<T>;
}

impl<T> FollowedByExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn followed_by(self, next: EventStream<T>) -> EventStream<T> {
        let output = OutputController::new(self.is_broadcast());
        let sink = output.sink();
        let next_is_broadcast = next.is_broadcast();

        let shared = Arc::new(ConcatShared {
            state: Mutex::new(ConcatState {
                current: None,
                deferred_next: false,
                pause_depth: 0,
            }),
            next: Mutex::new(Some(next)),
        });

        let mut pending = Some((self, sink.clone()));
        let listen_shared = Arc::clone(&shared);
        output.set_on_listen(move || {
            let Some((first, sink)) = pending.take() else {
                return;
            };
            let data_sink = sink.clone();
            let error_sink = sink.clone();
            let done_shared = Arc::clone(&listen_shared);
            let done_sink = sink;
            let subscription = first.listen(
                EventHandlers::new()
                    .on_data(move |v| data_sink.add(v))
                    .on_error(move |e| error_sink.add_error(e))
                    .on_done(move || {
                        let defer = {
                            let mut state = done_shared.state.lock();
                            state.current = None;
                            if state.pause_depth > 0 && next_is_broadcast {
                                state.deferred_next = true;
                                true
                            } else {
                                false
                            }
                        };
                        if !defer {
                            ConcatShared::subscribe_next(&done_shared, &done_sink);
                        }
                    }),
            );
            listen_shared.state.lock().current = Some(subscription);
        });

        let pause_shared = Arc::clone(&shared);
        output.set_on_pause(move || {
            let state = &mut *pause_shared.state.lock();
            state.pause_depth += 1;
            if let Some(subscription) = &state.current {
                subscription.pause();
            }
        });
        let resume_shared = Arc::clone(&shared);
        let resume_sink = sink;
        output.set_on_resume(move || {
            let subscribe_deferred = {
                let state = &mut *resume_shared.state.lock();
                if state.pause_depth > 0 {
                    state.pause_depth -= 1;
                }
                if let Some(subscription) = &state.current {
                    subscription.resume();
                }
                if state.pause_depth == 0 && state.deferred_next {
                    state.deferred_next = false;
                    true
                } else {
                    false
                }
            };
            if subscribe_deferred {
                ConcatShared::subscribe_next(&resume_shared, &resume_sink);
            }
        });

        if !output.is_broadcast() {
            let cancel_shared = Arc::clone(&shared);
            output.set_on_cancel(move || {
                let mut cancels = Vec::new();
                if let Some(subscription) = cancel_shared.state.lock().current.take() {
                    cancels.push(subscription.cancel());
                }
                cancel_shared.next.lock().take();
                join_cancels(cancels)
            });
        }

        output.stream()
    }
}
