// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Concurrent asynchronous mapping.

use crate::transform::{transform_events, TransformHandlers};
use parking_lot::Mutex;
use rivulet_core::{EventSink, EventStream, Result, ResultExt};
use rivulet_runtime::spawn;
use std::future::Future;
use std::sync::Arc;

/// Tracks in-flight conversions so the output closes only after the source
/// is done *and* every pending future has completed.
pub(crate) struct WorkTracker {
    values_waiting: usize,
    source_done: bool,
}

impl WorkTracker {
    pub(crate) fn new() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            values_waiting: 0,
            source_done: false,
        }))
    }

    pub(crate) fn begin(tracker: &Arc<Mutex<Self>>) {
        tracker.lock().values_waiting += 1;
    }

    /// Mark one unit of work finished; closes `sink` when nothing remains.
    pub(crate) fn finish<T: Clone + Send + 'static>(
        tracker: &Arc<Mutex<Self>>,
        sink: &EventSink<T>,
    ) {
        let close = {
            let mut state = tracker.lock();
            state.values_waiting -= 1;
            state.source_done && state.values_waiting == 0
        };
        if close {
            sink.close();
        }
    }

    /// Mark the source done; closes `sink` when nothing is in flight.
    pub(crate) fn source_done<T: Clone + Send + 'static>(
        tracker: &Arc<Mutex<Self>>,
        sink: &EventSink<T>,
    ) {
        let close = {
            let mut state = tracker.lock();
            state.source_done = true;
            state.values_waiting == 0
        };
        if close {
            sink.close();
        }
    }
}

/// Extension trait providing the
/// [`concurrent_async_map`](ConcurrentAsyncMapExt::concurrent_async_map)
/// operator.
pub trait ConcurrentAsyncMapExt<T>
where
    T: Clone + Send + 'static,
{
    /// Converts each value asynchronously, emitting results as they
    /// complete.
    ///
    /// Conversions run concurrently, so the output may be reordered
    /// relative to the input. A failing conversion emits its error in
    /// completion order like any result. The output closes once the source
    /// is done and no conversion is pending.
    fn concurrent_async_map<U, F, Fut>(self, convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U>> + Send + 'static;
}

impl<T> ConcurrentAsyncMapExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn concurrent_async_map<U, F, Fut>(self, mut convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U>> + Send + 'static,
    {
        let tracker = WorkTracker::new();
        let data_tracker = Arc::clone(&tracker);
        let done_tracker = tracker;
        transform_events(
            self,
            TransformHandlers::new(move |v, sink: &EventSink<U>| {
                WorkTracker::begin(&data_tracker);
                let future = convert(v);
                let task_tracker = Arc::clone(&data_tracker);
                let task_sink = sink.clone();
                spawn(async move {
                    match future.await.context("async map convert") {
                        Ok(result) => task_sink.add(result),
                        Err(e) => task_sink.add_error(e),
                    }
                    WorkTracker::finish(&task_tracker, &task_sink);
                });
            })
            .on_done(move |sink| {
                WorkTracker::source_done(&done_tracker, sink);
            }),
        )
    }
}
