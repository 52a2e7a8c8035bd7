// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rivulet_core::{
    join_cancels, EventHandlers, EventStream, OutputController, Result, ResultExt, Subscription,
};
use rivulet_runtime::spawn;
use std::future::Future;
use std::sync::Arc;

struct ScanState<A> {
    acc: A,
    busy: bool,
    source_done: bool,
}

/// Extension trait providing the [`scan`](ScanExt::scan) operator.
pub trait ScanExt<T>
where
    T: Clone + Send + 'static,
{
    /// Emits a running accumulation of the source.
    ///
    /// `combine` may complete asynchronously; while it is in flight the
    /// source is paused, so output order equals input order and at most one
    /// combine runs at a time. A failing combine emits the error and keeps
    /// the previous accumulator. On a broadcast output `combine` runs once
    /// per event, not per listener.
    fn scan<A, F, Fut>(self, initial: A, combine: F) -> EventStream<A>
    where
        A: Clone + Send + 'static,
        F: FnMut(A, T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<A>> + Send + 'static;
}

impl<T> ScanExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn scan<A, F, Fut>(self, initial: A, combine: F) -> EventStream<A>
    where
        A: Clone + Send + 'static,
        F: FnMut(A, T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<A>> + Send + 'static,
    {
        let output = OutputController::new(self.is_broadcast());
        let sink = output.sink();

        let state = Arc::new(Mutex::new(ScanState {
            acc: initial,
            busy: false,
            source_done: false,
        }));
        let upstream: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let mut pending = Some((self, sink, combine));
        let listen_state = Arc::clone(&state);
        let listen_upstream = Arc::clone(&upstream);
        output.set_on_listen(move || {
            let Some((source, sink, mut combine)) = pending.take() else {
                return;
            };

            let data_state = Arc::clone(&listen_state);
            let data_upstream = Arc::clone(&listen_upstream);
            let data_sink = sink.clone();
            let error_sink = sink.clone();
            let done_state = Arc::clone(&listen_state);
            let done_sink = sink;
            let subscription = source.listen(
                EventHandlers::new()
                    .on_data(move |v| {
                        let future = {
                            let mut state = data_state.lock();
                            state.busy = true;
                            combine(state.acc.clone(), v)
                        };
                        // Hold the source back until the combine resolves.
                        if let Some(subscription) = &*data_upstream.lock() {
                            subscription.pause();
                        }
                        let task_state = Arc::clone(&data_state);
                        let task_upstream = Arc::clone(&data_upstream);
                        let task_sink = data_sink.clone();
                        spawn(async move {
                            let result = future.await.context("scan combine");
                            let close = {
                                let mut state = task_state.lock();
                                state.busy = false;
                                match result {
                                    Ok(acc) => {
                                        state.acc = acc.clone();
                                        task_sink.add(acc);
                                    }
                                    Err(e) => task_sink.add_error(e),
                                }
                                state.source_done
                            };
                            if let Some(subscription) = &*task_upstream.lock() {
                                subscription.resume();
                            }
                            if close {
                                task_sink.close();
                            }
                        });
                    })
                    .on_error(move |e| error_sink.add_error(e))
                    .on_done(move || {
                        let close_now = {
                            let mut state = done_state.lock();
                            state.source_done = true;
                            !state.busy
                        };
                        if close_now {
                            done_sink.close();
                        }
                    }),
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
            output.set_on_cancel(move || {
                let mut cancels = Vec::new();
                if let Some(subscription) = cancel_upstream.lock().take() {
                    cancels.push(subscription.cancel());
                }
                join_cancels(cancels)
            });
        }

        output.stream()
    }
}
