// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::aggregate::trigger_aggregate;
use rivulet_core::EventStream;

/// Extension trait providing the [`buffer`](BufferExt::buffer) operator.
pub trait BufferExt<T>
where
    T: Clone + Send + 'static,
{
    /// Collects values until `trigger` fires, then emits them as one list.
    ///
    /// The trigger is long-polling: if it fires while the buffer is empty,
    /// the next value is emitted (as a one-element list) as soon as it
    /// arrives. The source closing flushes nothing by itself; a pending
    /// buffer waits for one final trigger before the output closes.
    fn buffer(self, trigger: EventStream<()>) -> EventStream<Vec<T>>;
}

impl<T> BufferExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn buffer(self, trigger: EventStream<()>) -> EventStream<Vec<T>> {
        trigger_aggregate(
            self,
            trigger,
            |value, acc: Option<Vec<T>>| {
                let mut list = acc.unwrap_or_default();
                list.push(value);
                list
            },
            true,
        )
    }
}
