// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::aggregate::trigger_aggregate;
use rivulet_core::EventStream;

/// Extension trait providing the [`sample`](SampleExt::sample) operator.
pub trait SampleExt<T>
where
    T: Clone + Send + 'static,
{
    /// Emits the most recent source value each time `trigger` fires.
    ///
    /// Values arriving between triggers overwrite each other; a trigger with
    /// nothing pending is ignored unless `long_poll` is set, in which case
    /// the next value passes through immediately.
    fn sample(self, trigger: EventStream<()>, long_poll: bool) -> EventStream<T>;
}

impl<T> SampleExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn sample(self, trigger: EventStream<()>, long_poll: bool) -> EventStream<T> {
        trigger_aggregate(self, trigger, |value, _| value, long_poll)
    }
}
