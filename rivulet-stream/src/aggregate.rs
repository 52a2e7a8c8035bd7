// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The trigger-aggregate primitive.
//!
//! Folds events from a *values* stream into an accumulator and flushes it
//! when a separate *trigger* stream fires. `buffer` and `sample` are thin
//! wrappers; the async-map batching operators drive the trigger from their
//! own work-completed signal.

use parking_lot::Mutex;
use rivulet_core::{
    join_cancels, EventHandlers, EventSink, EventStream, OutputController, Subscription,
};
use rivulet_runtime::spawn;
use std::sync::Arc;

struct AggregateState<A, F> {
    fold: F,
    current: Option<A>,
    /// False once a trigger fired while the accumulator was empty
    /// (long-poll); the next value then flushes immediately.
    waiting_for_trigger: bool,
    values_done: bool,
    trigger_done: bool,
}

struct Shared<A, F> {
    state: Mutex<AggregateState<A, F>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl<A, F> Shared<A, F> {
    /// Close the output and detach from both inputs.
    fn close<O: Clone + Send + 'static>(&self, sink: &EventSink<O>) {
        sink.close();
        let cancels: Vec<_> = self
            .subscriptions
            .lock()
            .drain(..)
            .map(|s| s.cancel())
            .collect();
        spawn(async move {
            let _ = join_cancels(cancels).await;
        });
    }
}

/// Accumulate `values` with `fold`, emitting the accumulator whenever
/// `trigger` fires.
///
/// Rules:
/// - a value folds into the accumulator; if a trigger already fired while
///   the accumulator was empty, the result is emitted immediately;
/// - a trigger flushes a non-empty accumulator; with an empty one it either
///   arms the immediate pass-through (`long_poll`) or is ignored;
/// - values-done closes at once when the accumulator is empty, otherwise the
///   next trigger flushes and then closes;
/// - trigger-done closes at once unless a pass-through is armed, in which
///   case one more value is let through first;
/// - errors from either input are forwarded immediately.
pub fn trigger_aggregate<T, A, F>(
    values: EventStream<T>,
    trigger: EventStream<()>,
    fold: F,
    long_poll: bool,
) -> EventStream<A>
where
    T: Clone + Send + 'static,
    A: Clone + Send + 'static,
    F: FnMut(T, Option<A>) -> A + Send + 'static,
{
    let output = OutputController::new(values.is_broadcast());
    let sink = output.sink();

    let shared = Arc::new(Shared {
        state: Mutex::new(AggregateState {
            fold,
            current: None,
            waiting_for_trigger: true,
            values_done: false,
            trigger_done: false,
        }),
        subscriptions: Mutex::new(Vec::new()),
    });

    let mut pending = Some((values, trigger, sink));
    let listen_shared = Arc::clone(&shared);
    output.set_on_listen(move || {
        let Some((values, trigger, sink)) = pending.take() else {
            return;
        };

        let value_shared = Arc::clone(&listen_shared);
        let value_sink = sink.clone();
        let error_sink = sink.clone();
        let done_shared = Arc::clone(&listen_shared);
        let done_sink = sink.clone();
        let values_subscription = values.listen(
            EventHandlers::new()
                .on_data(move |v| {
                    let flushed = {
                        let mut state = value_shared.state.lock();
                        let acc = state.current.take();
                        let folded = (state.fold)(v, acc);
                        if state.waiting_for_trigger {
                            state.current = Some(folded);
                            None
                        } else {
                            state.waiting_for_trigger = true;
                            Some((folded, state.trigger_done))
                        }
                    };
                    if let Some((out, trigger_done)) = flushed {
                        value_sink.add(out);
                        if trigger_done {
                            value_shared.close(&value_sink);
                        }
                    }
                })
                .on_error(move |e| error_sink.add_error(e))
                .on_done(move || {
                    let close_now = {
                        let mut state = done_shared.state.lock();
                        state.values_done = true;
                        state.current.is_none()
                    };
                    if close_now {
                        done_shared.close(&done_sink);
                    }
                }),
        );

        let trigger_shared = Arc::clone(&listen_shared);
        let trigger_sink = sink.clone();
        let trigger_error_sink = sink.clone();
        let trigger_done_shared = Arc::clone(&listen_shared);
        let trigger_done_sink = sink;
        let trigger_subscription = trigger.listen(
            EventHandlers::new()
                .on_data(move |()| {
                    let flushed = {
                        let mut state = trigger_shared.state.lock();
                        match state.current.take() {
                            Some(out) => {
                                state.waiting_for_trigger = true;
                                Some((out, state.values_done))
                            }
                            None => {
                                if long_poll {
                                    state.waiting_for_trigger = false;
                                }
                                None
                            }
                        }
                    };
                    if let Some((out, values_done)) = flushed {
                        trigger_sink.add(out);
                        if values_done {
                            trigger_shared.close(&trigger_sink);
                        }
                    }
                })
                .on_error(move |e| trigger_error_sink.add_error(e))
                .on_done(move || {
                    let close_now = {
                        let mut state = trigger_done_shared.state.lock();
                        state.trigger_done = true;
                        state.waiting_for_trigger
                    };
                    if close_now {
                        // A value still parked in the accumulator can never
                        // flush; it is discarded with the close.
                        trigger_done_shared.close(&trigger_done_sink);
                    }
                }),
        );

        let mut subscriptions = listen_shared.subscriptions.lock();
        subscriptions.push(values_subscription);
        subscriptions.push(trigger_subscription);
    });

    let pause_shared = Arc::clone(&shared);
    output.set_on_pause(move || {
        for subscription in pause_shared.subscriptions.lock().iter() {
            subscription.pause();
        }
    });
    let resume_shared = Arc::clone(&shared);
    output.set_on_resume(move || {
        for subscription in resume_shared.subscriptions.lock().iter() {
            subscription.resume();
        }
    });

    if !output.is_broadcast() {
        let cancel_shared = Arc::clone(&shared);
        output.set_on_cancel(move || {
            let cancels: Vec<_> = cancel_shared
                .subscriptions
                .lock()
                .drain(..)
                .map(|s| s.cancel())
                .collect();
            join_cancels(cancels)
        });
    }

    output.stream()
}
