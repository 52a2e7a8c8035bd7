// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::followed_by::FollowedByExt;
use rivulet_core::EventStream;

/// Extension trait providing the `start_with` family of prefix operators.
pub trait StartWithExt<T>
where
    T: Clone + Send + 'static,
{
    /// Emits `value` before the source's events.
    fn start_with(self, value: T) -> EventStream<T>;

    /// Emits `values` in order before the source's events.
    fn start_with_many(self, values: Vec<T>) -> EventStream<T>;

    /// Emits all of `prefix`'s events before the source's.
    ///
    /// A non-broadcast prefix ahead of a broadcast source is converted to
    /// broadcast so the output keeps the source's subscription mode.
    fn start_with_stream(self, prefix: EventStream<T>) -> EventStream<T>;
}

impl<T> StartWithExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn start_with(self, value: T) -> EventStream<T> {
        self.start_with_many(vec![value])
    }

    fn start_with_many(self, values: Vec<T>) -> EventStream<T> {
        self.start_with_stream(EventStream::from_iter(values))
    }

    fn start_with_stream(self, prefix: EventStream<T>) -> EventStream<T> {
        let prefix = if self.is_broadcast() {
            prefix.into_broadcast()
        } else {
            prefix
        };
        prefix.followed_by(self)
    }
}
