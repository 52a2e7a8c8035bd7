// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::debounce::debounce_impl;
use rivulet_core::EventStream;
use std::time::Duration;

/// Extension trait providing the
/// [`debounce_buffer`](DebounceBufferExt::debounce_buffer) operator.
pub trait DebounceBufferExt<T>
where
    T: Clone + Send + 'static,
{
    /// Collects a whole burst and emits it as one list after `duration` of
    /// silence. Trailing-only.
    fn debounce_buffer(self, duration: Duration) -> EventStream<Vec<T>>;
}

impl<T> DebounceBufferExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn debounce_buffer(self, duration: Duration) -> EventStream<Vec<T>> {
        debounce_impl(self, duration, false, true, |value, acc: Option<Vec<T>>| {
            let mut list = acc.unwrap_or_default();
            list.push(value);
            list
        })
    }
}
