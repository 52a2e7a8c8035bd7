// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Merge-all and queued stream flattening.

use parking_lot::Mutex;
use rivulet_core::{
    join_cancels, resolved_cancel, EventHandlers, EventSink, EventStream, OutputController,
    Subscription,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

enum InnerSlot<U> {
    /// Broadcast inner parked until the (broadcast) output has a listener.
    Deferred(EventStream<U>),
    Active(Subscription),
}

struct ExpandShared<U> {
    state: Mutex<ExpandState<U>>,
}

struct ExpandState<U> {
    inners: BTreeMap<u64, InnerSlot<U>>,
    next_id: u64,
    outer: Option<Subscription>,
    outer_done: bool,
    pause_depth: usize,
    has_listener: bool,
}

impl<U: Clone + Send + 'static> ExpandShared<U> {
    fn subscribe_slot(shared: &Arc<Self>, id: u64, stream: EventStream<U>, sink: &EventSink<U>) {
        let data_sink = sink.clone();
        let error_sink = sink.clone();
        let done_shared = Arc::clone(shared);
        let done_sink = sink.clone();
        let subscription = stream.listen(
            EventHandlers::new()
                .on_data(move |v| data_sink.add(v))
                .on_error(move |e| error_sink.add_error(e))
                .on_done(move || {
                    let close = {
                        let mut state = done_shared.state.lock();
                        state.inners.remove(&id);
                        state.outer_done && state.inners.is_empty()
                    };
                    if close {
                        done_sink.close();
                    }
                }),
        );
        let mut state = shared.state.lock();
        for _ in 0..state.pause_depth {
            subscription.pause();
        }
        // The inner may have finished during listen; only keep live slots.
        if state.inners.contains_key(&id) {
            state.inners.insert(id, InnerSlot::Active(subscription));
        }
    }
}

/// Extension trait providing the
/// [`concurrent_async_expand`](ConcurrentAsyncExpandExt::concurrent_async_expand)
/// operator.
pub trait ConcurrentAsyncExpandExt<T>
where
    T: Clone + Send + 'static,
{
    /// Maps each value to a stream and interleaves all of them.
    ///
    /// Every inner stream stays subscribed until it closes; the output
    /// closes once the outer is done and no inner remains. A broadcast
    /// output listens to the outer eagerly (before any subscriber) and
    /// never cancels it; broadcast inners mapped while no subscriber is
    /// attached are parked and listened to once one arrives.
    fn concurrent_async_expand<U, F>(self, convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> EventStream<U> + Send + 'static;
}

impl<T> ConcurrentAsyncExpandExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn concurrent_async_expand<U, F>(self, mut convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> EventStream<U> + Send + 'static,
    {
        let broadcast = self.is_broadcast();
        let output = OutputController::new(broadcast);
        let sink = output.sink();

        let shared = Arc::new(ExpandShared {
            state: Mutex::new(ExpandState {
                inners: BTreeMap::new(),
                next_id: 0,
                outer: None,
                outer_done: false,
                pause_depth: 0,
                has_listener: false,
            }),
        });

        let subscribe_outer = {
            let shared = Arc::clone(&shared);
            let sink = sink.clone();
            move |source: EventStream<T>| {
                let data_shared = Arc::clone(&shared);
                let data_sink = sink.clone();
                let error_sink = sink.clone();
                let done_shared = Arc::clone(&shared);
                let done_sink = sink.clone();
                let subscription = source.listen(
                    EventHandlers::new()
                        .on_data(move |v| {
                            let stream = convert(v);
                            let activate = {
                                let mut state = data_shared.state.lock();
                                let id = state.next_id;
                                state.next_id += 1;
                                if broadcast && stream.is_broadcast() && !state.has_listener {
                                    state.inners.insert(id, InnerSlot::Deferred(stream));
                                    None
                                } else {
                                    state
                                        .inners
                                        .insert(id, InnerSlot::Deferred(stream.clone()));
                                    Some((id, stream))
                                }
                            };
                            if let Some((id, stream)) = activate {
                                ExpandShared::subscribe_slot(&data_shared, id, stream, &data_sink);
                            }
                        })
                        .on_error(move |e| error_sink.add_error(e))
                        .on_done(move || {
                            let close = {
                                let mut state = done_shared.state.lock();
                                state.outer_done = true;
                                state.inners.is_empty()
                            };
                            if close {
                                done_sink.close();
                            }
                        }),
                );
                shared.state.lock().outer = Some(subscription);
            }
        };

        if broadcast {
            // Eager: the outer is consumed whether or not anyone listens.
            subscribe_outer(self);
            let listen_shared = Arc::clone(&shared);
            let listen_sink = sink;
            output.set_on_listen(move || {
                let deferred: Vec<(u64, EventStream<U>)> = {
                    let mut state = listen_shared.state.lock();
                    state.has_listener = true;
                    state
                        .inners
                        .iter()
                        .filter_map(|(id, slot)| match slot {
                            InnerSlot::Deferred(stream) => Some((*id, stream.clone())),
                            InnerSlot::Active(_) => None,
                        })
                        .collect()
                };
                for (id, stream) in deferred {
                    ExpandShared::subscribe_slot(&listen_shared, id, stream, &listen_sink);
                }
            });
            let cancel_shared = Arc::clone(&shared);
            output.set_on_cancel(move || {
                // Never cancels the outer or the inners; just stop parking.
                cancel_shared.state.lock().has_listener = false;
                resolved_cancel()
            });
        } else {
            let mut pending = Some((self, subscribe_outer));
            output.set_on_listen(move || {
                if let Some((source, subscribe_outer)) = pending.take() {
                    subscribe_outer(source);
                }
            });

            let cancel_shared = Arc::clone(&shared);
            output.set_on_cancel(move || {
                let mut cancels = Vec::new();
                let mut state = cancel_shared.state.lock();
                if let Some(outer) = state.outer.take() {
                    cancels.push(outer.cancel());
                }
                let inners = std::mem::take(&mut state.inners);
                drop(state);
                for (_, slot) in inners {
                    if let InnerSlot::Active(subscription) = slot {
                        cancels.push(subscription.cancel());
                    }
                }
                join_cancels(cancels)
            });
        }

        let pause_shared = Arc::clone(&shared);
        output.set_on_pause(move || {
            let state = pause_shared.state.lock();
            if let Some(outer) = &state.outer {
                outer.pause();
            }
            for slot in state.inners.values() {
                if let InnerSlot::Active(subscription) = slot {
                    subscription.pause();
                }
            }
        });
        let resume_shared = Arc::clone(&shared);
        output.set_on_resume(move || {
            let state = resume_shared.state.lock();
            if let Some(outer) = &state.outer {
                outer.resume();
            }
            for slot in state.inners.values() {
                if let InnerSlot::Active(subscription) = slot {
                    subscription.resume();
                }
            }
        });

        output.stream()
    }
}

struct SequentialShared<U> {
    state: Mutex<SequentialState<U>>,
}

struct SequentialState<U> {
    active: Option<Subscription>,
    queue: VecDeque<EventStream<U>>,
    outer: Option<Subscription>,
    outer_done: bool,
    pause_depth: usize,
}

impl<U: Clone + Send + 'static> SequentialShared<U> {
    fn subscribe_next(shared: &Arc<Self>, stream: EventStream<U>, sink: &EventSink<U>) {
        let data_sink = sink.clone();
        let error_sink = sink.clone();
        let done_shared = Arc::clone(shared);
        let done_sink = sink.clone();
        let subscription = stream.listen(
            EventHandlers::new()
                .on_data(move |v| data_sink.add(v))
                .on_error(move |e| error_sink.add_error(e))
                .on_done(move || {
                    let (next, close) = {
                        let mut state = done_shared.state.lock();
                        state.active = None;
                        match state.queue.pop_front() {
                            Some(stream) => (Some(stream), false),
                            None => (None, state.outer_done),
                        }
                    };
                    if let Some(stream) = next {
                        SequentialShared::subscribe_next(&done_shared, stream, &done_sink);
                    } else if close {
                        done_sink.close();
                    }
                }),
        );
        let mut state = shared.state.lock();
        for _ in 0..state.pause_depth {
            subscription.pause();
        }
        state.active = Some(subscription);
    }
}

/// Extension trait providing the
/// [`sequential_async_expand`](SequentialAsyncExpandExt::sequential_async_expand)
/// operator.
pub trait SequentialAsyncExpandExt<T>
where
    T: Clone + Send + 'static,
{
    /// Maps each value to a stream and concatenates them in outer order.
    ///
    /// Streams mapped from later outer values are queued unlistened until
    /// every earlier inner stream has closed; previous inner subscriptions
    /// are never canceled by a new outer value.
    fn sequential_async_expand<U, F>(self, convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> EventStream<U> + Send + 'static;
}

impl<T> SequentialAsyncExpandExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn sequential_async_expand<U, F>(self, convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> EventStream<U> + Send + 'static,
    {
        let output = OutputController::new(self.is_broadcast());
        let sink = output.sink();

        let shared = Arc::new(SequentialShared {
            state: Mutex::new(SequentialState {
                active: None,
                queue: VecDeque::new(),
                outer: None,
                outer_done: false,
                pause_depth: 0,
            }),
        });

        let mut pending = Some((self, sink, convert));
        let listen_shared = Arc::clone(&shared);
        output.set_on_listen(move || {
            let Some((source, sink, mut convert)) = pending.take() else {
                return;
            };
            let data_shared = Arc::clone(&listen_shared);
            let data_sink = sink.clone();
            let error_sink = sink.clone();
            let done_shared = Arc::clone(&listen_shared);
            let done_sink = sink;
            let subscription = source.listen(
                EventHandlers::new()
                    .on_data(move |v| {
                        let stream = convert(v);
                        let start_now = {
                            let mut state = data_shared.state.lock();
                            if state.active.is_none() && state.queue.is_empty() {
                                true
                            } else {
                                state.queue.push_back(stream.clone());
                                false
                            }
                        };
                        if start_now {
                            SequentialShared::subscribe_next(&data_shared, stream, &data_sink);
                        }
                    })
                    .on_error(move |e| error_sink.add_error(e))
                    .on_done(move || {
                        let close = {
                            let mut state = done_shared.state.lock();
                            state.outer_done = true;
                            state.active.is_none() && state.queue.is_empty()
                        };
                        if close {
                            done_sink.close();
                        }
                    }),
            );
            listen_shared.state.lock().outer = Some(subscription);
        });

        let pause_shared = Arc::clone(&shared);
        output.set_on_pause(move || {
            let mut state = pause_shared.state.lock();
            state.pause_depth += 1;
            if let Some(outer) = &state.outer {
                outer.pause();
            }
            if let Some(active) = &state.active {
                active.pause();
            }
        });
        let resume_shared = Arc::clone(&shared);
        output.set_on_resume(move || {
            let mut state = resume_shared.state.lock();
            if state.pause_depth > 0 {
                state.pause_depth -= 1;
            }
            if let Some(outer) = &state.outer {
                outer.resume();
            }
            if let Some(active) = &state.active {
                active.resume();
            }
        });

        if !output.is_broadcast() {
            let cancel_shared = Arc::clone(&shared);
            output.set_on_cancel(move || {
                let mut cancels = Vec::new();
                let mut state = cancel_shared.state.lock();
                state.queue.clear();
                if let Some(outer) = state.outer.take() {
                    cancels.push(outer.cancel());
                }
                if let Some(active) = state.active.take() {
                    cancels.push(active.cancel());
                }
                drop(state);
                join_cancels(cancels)
            });
        }

        output.stream()
    }
}
