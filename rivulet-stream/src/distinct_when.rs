// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::transform::{transform_events, TransformHandlers};
use rivulet_core::EventStream;

/// Extension trait providing the
/// [`distinct_when`](DistinctWhenExt::distinct_when) operator.
pub trait DistinctWhenExt<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Emits a value when it differs from the last *seen* value, or when
    /// `predicate` rejects it.
    ///
    /// The comparison baseline is the previous event, not the previous
    /// emission: a run of equal values accepted by the predicate collapses
    /// to its first element, but any rejected value is emitted regardless.
    fn distinct_when<F>(self, predicate: F) -> EventStream<T>
    where
        F: Fn(&T) -> bool + Send + 'static;
}

impl<T> DistinctWhenExt<T> for EventStream<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    fn distinct_when<F>(self, predicate: F) -> EventStream<T>
    where
        F: Fn(&T) -> bool + Send + 'static,
    {
        let mut previous: Option<T> = None;
        transform_events(
            self,
            TransformHandlers::new(move |v: T, sink| {
                let differs = previous.as_ref() != Some(&v);
                let rejected = !predicate(&v);
                previous = Some(v.clone());
                if differs || rejected {
                    sink.add(v);
                }
            }),
        )
    }
}
