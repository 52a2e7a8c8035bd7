// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::transform::{transform_events, TransformHandlers};
use rivulet_core::EventStream;

/// Extension trait providing the [`where_type`](WhereTypeExt::where_type)
/// operator.
pub trait WhereTypeExt<T>
where
    T: Clone + Send + 'static,
{
    /// Keeps only the events for which `select` produces a value.
    ///
    /// The caller encodes the type test: `select` returns `Some` with the
    /// narrowed value for matching events and `None` for the rest. Errors
    /// and done pass through untouched.
    fn where_type<U, F>(self, select: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static;
}

impl<T> WhereTypeExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn where_type<U, F>(self, mut select: F) -> EventStream<U>
    where
        U: Clone + Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        transform_events(
            self,
            TransformHandlers::new(move |v, sink| {
                if let Some(narrowed) = select(v) {
                    sink.add(narrowed);
                }
            }),
        )
    }
}
