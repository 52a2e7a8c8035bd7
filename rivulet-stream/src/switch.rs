// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Cancel-previous stream flattening.
//!
//! The inner lifecycle is an explicit three-state machine: no inner, active
//! inner, cancelling-with-pending. The third state matters: an outer event
//! arriving while the previous inner's cancel is still in flight must
//! replace the parked stream, not spawn a second cancel.

use parking_lot::Mutex;
use rivulet_core::{
    join_cancels, EventHandlers, EventSink, EventStream, OutputController, Subscription,
};
use rivulet_runtime::spawn;
use std::sync::Arc;

#[derive(Clone, Copy, PartialEq)]
enum InnerPhase {
    Idle,
    Active,
    Cancelling,
}

struct SwitchShared<U> {
    state: Mutex<SwitchState<U>>,
}

struct SwitchState<U> {
    phase: InnerPhase,
    inner: Option<Subscription>,
    pending: Option<EventStream<U>>,
    outer: Option<Subscription>,
    outer_done: bool,
    pause_depth: usize,
    /// Incremented per inner subscription; stale done callbacks are ignored.
    generation: u64,
}

fn subscribe_inner<U: Clone + Send + 'static>(
    shared: &Arc<SwitchShared<U>>,
    stream: EventStream<U>,
    sink: &EventSink<U>,
) {
    let generation = {
        let mut state = shared.state.lock();
        state.generation += 1;
        state.generation
    };

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
                    if state.generation != generation {
                        return;
                    }
                    state.inner = None;
                    state.phase = InnerPhase::Idle;
                    state.outer_done && state.pending.is_none()
                };
                if close {
                    done_sink.close();
                }
            }),
    );

    let mut state = shared.state.lock();
    state.phase = InnerPhase::Active;
    for _ in 0..state.pause_depth {
        subscription.pause();
    }
    state.inner = Some(subscription);
}

pub(crate) fn switch_map_impl<T, U, F>(source: EventStream<T>, convert: F) -> EventStream<U>
where
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
    F: FnMut(T) -> EventStream<U> + Send + 'static,
{
    let output = OutputController::new(source.is_broadcast());
    let sink = output.sink();

    let shared = Arc::new(SwitchShared {
        state: Mutex::new(SwitchState {
            phase: InnerPhase::Idle,
            inner: None,
            pending: None,
            outer: None,
            outer_done: false,
            pause_depth: 0,
            generation: 0,
        }),
    });

    let mut pending_listen = Some((source, sink, convert));
    let listen_shared = Arc::clone(&shared);
    output.set_on_listen(move || {
        let Some((source, sink, mut convert)) = pending_listen.take() else {
            return;
        };

        let data_shared = Arc::clone(&listen_shared);
        let data_sink = sink.clone();
        let error_sink = sink.clone();
        let done_shared = Arc::clone(&listen_shared);
        let done_sink = sink.clone();
        let outer_subscription = source.listen(
            EventHandlers::new()
                .on_data(move |v| {
                    let stream = convert(v);
                    let mut subscribe_now = None;
                    let mut cancel_previous = None;
                    {
                        let mut state = data_shared.state.lock();
                        match state.phase {
                            InnerPhase::Cancelling => {
                                // Replace whatever was parked.
                                state.pending = Some(stream);
                            }
                            InnerPhase::Active => {
                                state.phase = InnerPhase::Cancelling;
                                state.pending = Some(stream);
                                cancel_previous = state.inner.take();
                            }
                            InnerPhase::Idle => {
                                subscribe_now = Some(stream);
                            }
                        }
                    }
                    if let Some(stream) = subscribe_now {
                        subscribe_inner(&data_shared, stream, &data_sink);
                    } else if let Some(previous) = cancel_previous {
                        let task_shared = Arc::clone(&data_shared);
                        let task_sink = data_sink.clone();
                        spawn(async move {
                            let _ = previous.cancel().await;
                            let next = {
                                let mut state = task_shared.state.lock();
                                match state.pending.take() {
                                    Some(stream) => Some(stream),
                                    None => {
                                        state.phase = InnerPhase::Idle;
                                        None
                                    }
                                }
                            };
                            match next {
                                Some(stream) => {
                                    subscribe_inner(&task_shared, stream, &task_sink);
                                }
                                None => {
                                    let close = {
                                        let state = task_shared.state.lock();
                                        state.outer_done && state.inner.is_none()
                                    };
                                    if close {
                                        task_sink.close();
                                    }
                                }
                            }
                        });
                    }
                })
                .on_error(move |e| error_sink.add_error(e))
                .on_done(move || {
                    let close = {
                        let mut state = done_shared.state.lock();
                        state.outer_done = true;
                        state.phase == InnerPhase::Idle && state.pending.is_none()
                    };
                    if close {
                        done_sink.close();
                    }
                }),
        );
        listen_shared.state.lock().outer = Some(outer_subscription);
    });

    let pause_shared = Arc::clone(&shared);
    output.set_on_pause(move || {
        let mut state = pause_shared.state.lock();
        state.pause_depth += 1;
        if let Some(outer) = &state.outer {
            outer.pause();
        }
        if let Some(inner) = &state.inner {
            inner.pause();
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
        if let Some(inner) = &state.inner {
            inner.resume();
        }
    });

    if !output.is_broadcast() {
        let cancel_shared = Arc::clone(&shared);
        output.set_on_cancel(move || {
            let mut cancels = Vec::new();
            let mut state = cancel_shared.state.lock();
            state.pending = None;
            if let Some(outer) = state.outer.take() {
                cancels.push(outer.cancel());
            }
            if let Some(inner) = state.inner.take() {
                cancels.push(inner.cancel());
            }
            drop(state);
            join_cancels(cancels)
        });
    }

    output.stream()
}

/// Extension trait providing the [`switch_map`](SwitchMapExt::switch_map)
/// operator.
pub trait SwitchMapExt<T>
where
    T: Clone + Send + 'static,
{
    /// Maps each value to a stream, emitting events of the newest one.
    ///
    /// When the outer stream produces a value the previous inner
    /// subscription is canceled before the new stream is listened to;
    /// outer values arriving mid-cancel replace each other. The output
    /// closes once the outer is done and the final inner has closed.
    ///
    /// For a broadcast output over single-subscription inners, an inner
    /// subscription outlives listener churn and cannot be re-listened.
    fn switch_map<U, F>(self, convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> EventStream<U> + Send + 'static;
}

impl<T> SwitchMapExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn switch_map<U, F>(self, convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> EventStream<U> + Send + 'static,
    {
        switch_map_impl(self, convert)
    }
}

/// Extension trait providing the
/// [`switch_latest`](SwitchLatestExt::switch_latest) operator.
pub trait SwitchLatestExt<U>
where
    U: Clone + Send + 'static,
{
    /// Flattens a stream of streams, following the newest inner stream.
    fn switch_latest(self) -> EventStream<U>;
}

impl<U> SwitchLatestExt<U> for EventStream<EventStream<U>>
where
    U: Clone + Send + 'static,
{
    fn switch_latest(self) -> EventStream<U> {
        switch_map_impl(self, |stream| stream)
    }
}
