// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::async_map_buffer::serialized_map;
use crate::sample::SampleExt;
use rivulet_core::{EventStream, Result, StreamController};
use std::future::Future;

/// Extension trait providing the
/// [`async_map_sample`](AsyncMapSampleExt::async_map_sample) operator.
pub trait AsyncMapSampleExt<T>
where
    T: Clone + Send + 'static,
{
    /// Converts values asynchronously, keeping only the newest while busy.
    ///
    /// Like [`async_map_buffer`](crate::AsyncMapBufferExt::async_map_buffer)
    /// but values arriving during a conversion overwrite each other: when
    /// the conversion completes, only the most recent value is converted
    /// next. Source order is preserved.
    fn async_map_sample<U, F, Fut>(self, convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U>> + Send + 'static;
}

impl<T> AsyncMapSampleExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn async_map_sample<U, F, Fut>(self, convert: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U>> + Send + 'static,
    {
        let work_finished = StreamController::new();
        let latest = self.sample(work_finished.stream(), true);
        work_finished.add(());
        serialized_map(latest, &work_finished, convert)
    }
}
