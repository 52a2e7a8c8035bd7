// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Combine-latest fan-in operators.

use parking_lot::Mutex;
use rivulet_core::{
    join_cancels, EventHandlers, EventSink, EventStream, OutputController, Result, ResultExt,
    Subscription,
};
use rivulet_runtime::spawn;
use std::future::Future;
use std::sync::Arc;

struct PairState<T, U, F> {
    combine: F,
    latest_a: Option<T>,
    latest_b: Option<U>,
    busy: bool,
    a_done: bool,
    b_done: bool,
}

struct PairShared<T, U, F> {
    state: Mutex<PairState<T, U, F>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl<T, U, F> PairShared<T, U, F> {
    fn close_and_detach<R: Clone + Send + 'static>(&self, sink: &EventSink<R>) {
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

    fn pause_all(&self) {
        for subscription in self.subscriptions.lock().iter() {
            subscription.pause();
        }
    }

    fn resume_all(&self) {
        for subscription in self.subscriptions.lock().iter() {
            subscription.resume();
        }
    }
}

/// Extension trait providing the `combine_latest` fan-in operators.
pub trait CombineLatestExt<T>
where
    T: Clone + Send + 'static,
{
    /// Combines the latest values of this stream and `other`.
    ///
    /// Nothing is emitted until both inputs have produced a value; from then
    /// on every event from either side emits `combine(latest_a, latest_b)`.
    /// While an asynchronous combine is in flight both inputs are paused and
    /// resumed afterwards. If either input closes without ever emitting, the
    /// output closes immediately; otherwise it closes when both inputs have
    /// closed.
    fn combine_latest<U, R, F, Fut>(self, other: EventStream<U>, combine: F) -> EventStream<R>
    where
        U: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: FnMut(&T, &U) -> Fut + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static;

    /// N-ary `combine_latest` emitting a fresh snapshot of all latest
    /// values (this stream first, then `others` in order).
    fn combine_latest_all(self, others: Vec<EventStream<T>>) -> EventStream<Vec<T>>;
}

impl<T> CombineLatestExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn combine_latest<U, R, F, Fut>(self, other: EventStream<U>, combine: F) -> EventStream<R>
    where
        U: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: FnMut(&T, &U) -> Fut + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let output = OutputController::new(self.is_broadcast());
        let sink = output.sink();

        let shared = Arc::new(PairShared {
            state: Mutex::new(PairState {
                combine,
                latest_a: None,
                latest_b: None,
                busy: false,
                a_done: false,
                b_done: false,
            }),
            subscriptions: Mutex::new(Vec::new()),
        });

        let mut pending = Some((self, other, sink));
        let listen_shared = Arc::clone(&shared);
        output.set_on_listen(move || {
            let Some((source, other, sink)) = pending.take() else {
                return;
            };

            let a_shared = Arc::clone(&listen_shared);
            let a_sink = sink.clone();
            let a_error_sink = sink.clone();
            let a_done_shared = Arc::clone(&listen_shared);
            let a_done_sink = sink.clone();
            let source_subscription = source.listen(
                EventHandlers::new()
                    .on_data(move |v| {
                        let future = {
                            let mut guard = a_shared.state.lock();
                            let state = &mut *guard;
                            state.latest_a = Some(v);
                            match (state.latest_a.clone(), state.latest_b.clone()) {
                                (Some(a), Some(b)) => {
                                    state.busy = true;
                                    Some((state.combine)(&a, &b))
                                }
                                _ => None,
                            }
                        };
                        if let Some(future) = future {
                            run_combine(&a_shared, future, &a_sink);
                        }
                    })
                    .on_error(move |e| a_error_sink.add_error(e))
                    .on_done(move || {
                        let decision = {
                            let mut state = a_done_shared.state.lock();
                            state.a_done = true;
                            if state.latest_a.is_none() {
                                CloseDecision::Now
                            } else if state.b_done && !state.busy {
                                CloseDecision::Now
                            } else {
                                CloseDecision::Defer
                            }
                        };
                        if decision == CloseDecision::Now {
                            a_done_shared.close_and_detach(&a_done_sink);
                        }
                    }),
            );

            let b_shared = Arc::clone(&listen_shared);
            let b_sink = sink.clone();
            let b_error_sink = sink.clone();
            let b_done_shared = Arc::clone(&listen_shared);
            let b_done_sink = sink;
            let other_subscription = other.listen(
                EventHandlers::new()
                    .on_data(move |v| {
                        let future = {
                            let mut guard = b_shared.state.lock();
                            let state = &mut *guard;
                            state.latest_b = Some(v);
                            match (state.latest_a.clone(), state.latest_b.clone()) {
                                (Some(a), Some(b)) => {
                                    state.busy = true;
                                    Some((state.combine)(&a, &b))
                                }
                                _ => None,
                            }
                        };
                        if let Some(future) = future {
                            run_combine(&b_shared, future, &b_sink);
                        }
                    })
                    .on_error(move |e| b_error_sink.add_error(e))
                    .on_done(move || {
                        let decision = {
                            let mut state = b_done_shared.state.lock();
                            state.b_done = true;
                            if state.latest_b.is_none() {
                                CloseDecision::Now
                            } else if state.a_done && !state.busy {
                                CloseDecision::Now
                            } else {
                                CloseDecision::Defer
                            }
                        };
                        if decision == CloseDecision::Now {
                            b_done_shared.close_and_detach(&b_done_sink);
                        }
                    }),
            );

            let mut subscriptions = listen_shared.subscriptions.lock();
            subscriptions.push(source_subscription);
            subscriptions.push(other_subscription);
        });

        let pause_shared = Arc::clone(&shared);
        output.set_on_pause(move || pause_shared.pause_all());
        let resume_shared = Arc::clone(&shared);
        output.set_on_resume(move || resume_shared.resume_all());

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

    fn combine_latest_all(self, others: Vec<EventStream<T>>) -> EventStream<Vec<T>> {
        let output = OutputController::new(self.is_broadcast());
        let sink = output.sink();

        let mut inputs = Vec::with_capacity(others.len() + 1);
        inputs.push(self);
        inputs.extend(others);
        let input_count = inputs.len();

        struct AllShared<T> {
            latest: Mutex<Vec<Option<T>>>,
            done: Mutex<Vec<bool>>,
            subscriptions: Mutex<Vec<Subscription>>,
        }

        impl<T: Clone + Send + 'static> AllShared<T> {
            fn close_and_detach(&self, sink: &EventSink<Vec<T>>) {
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

        let shared = Arc::new(AllShared {
            latest: Mutex::new(vec![None; input_count]),
            done: Mutex::new(vec![false; input_count]),
            subscriptions: Mutex::new(Vec::new()),
        });

        let mut pending = Some((inputs, sink));
        let listen_shared = Arc::clone(&shared);
        output.set_on_listen(move || {
            let Some((inputs, sink)) = pending.take() else {
                return;
            };
            let mut subscriptions = Vec::with_capacity(inputs.len());
            for (index, input) in inputs.into_iter().enumerate() {
                let data_shared = Arc::clone(&listen_shared);
                let data_sink = sink.clone();
                let error_sink = sink.clone();
                let done_shared = Arc::clone(&listen_shared);
                let done_sink = sink.clone();
                subscriptions.push(input.listen(
                    EventHandlers::new()
                        .on_data(move |v| {
                            let snapshot = {
                                let mut latest = data_shared.latest.lock();
                                latest[index] = Some(v);
                                if latest.iter().all(Option::is_some) {
                                    // Fresh copy per emission.
                                    Some(latest.iter().flatten().cloned().collect::<Vec<_>>())
                                } else {
                                    None
                                }
                            };
                            if let Some(snapshot) = snapshot {
                                data_sink.add(snapshot);
                            }
                        })
                        .on_error(move |e| error_sink.add_error(e))
                        .on_done(move || {
                            let close = {
                                let mut done = done_shared.done.lock();
                                done[index] = true;
                                let never_emitted =
                                    done_shared.latest.lock()[index].is_none();
                                never_emitted || done.iter().all(|d| *d)
                            };
                            if close {
                                done_shared.close_and_detach(&done_sink);
                            }
                        }),
                ));
            }
            *listen_shared.subscriptions.lock() = subscriptions;
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
}

#[derive(PartialEq)]
enum CloseDecision {
    Now,
    Defer,
}

/// Await one combine with both inputs paused, emit its result, then resume
/// and settle any deferred close.
fn run_combine<T, U, F, R, Fut>(
    shared: &Arc<PairShared<T, U, F>>,
    future: Fut,
    sink: &EventSink<R>,
) where
    T: Send + 'static,
    U: Send + 'static,
    F: Send + 'static,
    R: Clone + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    shared.pause_all();
    let task_shared = Arc::clone(shared);
    let task_sink = sink.clone();
    spawn(async move {
        let result = future.await.context("combine latest");
        let close = {
            let mut state = task_shared.state.lock();
            state.busy = false;
            match result {
                Ok(value) => task_sink.add(value),
                Err(e) => task_sink.add_error(e),
            }
            state.a_done && state.b_done
        };
        task_shared.resume_all();
        if close {
            task_shared.close_and_detach(&task_sink);
        }
    });
}
