// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::async_map::WorkTracker;
use crate::transform::{transform_events, TransformHandlers};
use rivulet_core::{EventSink, EventStream, Result, ResultExt};
use rivulet_runtime::spawn;
use std::future::Future;
use std::sync::Arc;

/// Extension trait providing the [`async_where`](AsyncWhereExt::async_where)
/// operator.
pub trait AsyncWhereExt<T>
where
    T: Clone + Send + 'static,
{
    /// Filters with an asynchronous predicate.
    ///
    /// Elements whose predicate resolves to `true` are forwarded; predicate
    /// errors are emitted on the output. Predicates run concurrently, so
    /// passing elements appear in completion order. The output closes once
    /// the source is done and no predicate is pending.
    fn async_where<F, Fut>(self, predicate: F) -> EventStream<T>
    where
        F: FnMut(&T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static;
}

impl<T> AsyncWhereExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn async_where<F, Fut>(self, mut predicate: F) -> EventStream<T>
    where
        F: FnMut(&T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        let tracker = WorkTracker::new();
        let data_tracker = Arc::clone(&tracker);
        let done_tracker = tracker;
        transform_events(
            self,
            TransformHandlers::new(move |v: T, sink: &EventSink<T>| {
                WorkTracker::begin(&data_tracker);
                let future = predicate(&v);
                let task_tracker = Arc::clone(&data_tracker);
                let task_sink = sink.clone();
                spawn(async move {
                    match future.await.context("async where predicate") {
                        Ok(true) => task_sink.add(v),
                        Ok(false) => {}
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
