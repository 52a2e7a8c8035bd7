// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Batching asynchronous mapping.
//!
//! Built as `buffer(work_finished)` feeding a one-at-a-time conversion
//! stage; the stage fires `work_finished` after each completion to request
//! the next batch. The long-polling buffer lets the first value through
//! alone and releases a fresh batch the instant work finishes.

use crate::async_map::WorkTracker;
use crate::buffer::BufferExt;
use crate::transform::{transform_events, TransformHandlers};
use rivulet_core::{EventSink, EventStream, Result, ResultExt, StreamController};
use rivulet_runtime::spawn;
use std::future::Future;
use std::sync::Arc;

/// Conversion stage shared with `async_map_sample`: one conversion in
/// flight, each completion emits its result and requests more input.
pub(crate) fn serialized_map<B, U, F, Fut>(
    batches: EventStream<B>,
    work_finished: &StreamController<()>,
    mut convert: F,
) -> EventStream<U>
where
    B: Clone + Send + 'static,
    U: Clone + Send + 'static,
    F: FnMut(B) -> Fut + Send + 'static,
    Fut: Future<Output = Result<U>> + Send + 'static,
{
    let tracker = WorkTracker::new();
    let data_tracker = Arc::clone(&tracker);
    let done_tracker = tracker;
    let trigger = work_finished.sink();
    transform_events(
        batches,
        TransformHandlers::new(move |batch, sink: &EventSink<U>| {
            WorkTracker::begin(&data_tracker);
            let future = convert(batch);
            let task_tracker = Arc::clone(&data_tracker);
            let task_sink = sink.clone();
            let task_trigger = trigger.clone();
            spawn(async move {
                match future.await.context("batched convert") {
                    Ok(result) => task_sink.add(result),
                    Err(e) => task_sink.add_error(e),
                }
                task_trigger.add(());
                WorkTracker::finish(&task_tracker, &task_sink);
            });
        })
        .on_done(move |sink| {
            WorkTracker::source_done(&done_tracker, sink);
        }),
    )
}

/// Extension trait providing the
/// [`async_map_buffer`](AsyncMapBufferExt::async_map_buffer) operator.
pub trait AsyncMapBufferExt<T>
where
    T: Clone + Send + 'static,
{
    /// Converts batches of values asynchronously, one batch at a time.
    ///
    /// The first value is converted alone. Values arriving while a
    /// conversion runs are collected; when it completes, the collected
    /// (non-empty) batch is converted next. Source order is preserved.
    fn async_map_buffer<U, F, Fut>(self, convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(Vec<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U>> + Send + 'static;
}

impl<T> AsyncMapBufferExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn async_map_buffer<U, F, Fut>(self, convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(Vec<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U>> + Send + 'static,
    {
        let work_finished = StreamController::new();
        let batches = self.buffer(work_finished.stream());
        // Arm the long-poll so the first value passes straight through.
        work_finished.add(());
        serialized_map(batches, &work_finished, convert)
    }
}
