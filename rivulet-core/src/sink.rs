// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::broadcast::BroadcastShared;
use crate::controller::SingleShared;
use crate::event::Event;
use rivulet_error::StreamError;
use std::sync::Arc;

/// A cloneable write handle to a stream controller.
///
/// Operators hand sinks to their handlers, timer callbacks and spawned
/// tasks; all of them write into the same output stream. Writes after the
/// sink is closed are silently suppressed.
pub struct EventSink<T> {
    inner: SinkInner<T>,
}

enum SinkInner<T> {
    Single(Arc<SingleShared<T>>),
    Broadcast(Arc<BroadcastShared<T>>),
}

impl<T: Clone + Send + 'static> EventSink<T> {
    pub(crate) fn single(shared: Arc<SingleShared<T>>) -> Self {
        Self {
            inner: SinkInner::Single(shared),
        }
    }

    pub(crate) fn broadcast(shared: Arc<BroadcastShared<T>>) -> Self {
        Self {
            inner: SinkInner::Broadcast(shared),
        }
    }

    /// Write a data event.
    pub fn add(&self, value: T) {
        self.dispatch(Event::Data(value));
    }

    /// Write an error event. The stream stays open.
    pub fn add_error(&self, error: StreamError) {
        self.dispatch(Event::Error(error));
    }

    /// Terminate the stream. Idempotent; later writes are dropped.
    pub fn close(&self) {
        self.dispatch(Event::Done);
    }

    /// Whether the stream has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match &self.inner {
            SinkInner::Single(shared) => shared.is_closed(),
            SinkInner::Broadcast(shared) => shared.is_closed(),
        }
    }

    fn dispatch(&self, event: Event<T>) {
        match &self.inner {
            SinkInner::Single(shared) => shared.dispatch(event),
            SinkInner::Broadcast(shared) => shared.dispatch(event),
        }
    }
}

impl<T> Clone for EventSink<T> {
    fn clone(&self) -> Self {
        Self {
            inner: match &self.inner {
                SinkInner::Single(shared) => SinkInner::Single(Arc::clone(shared)),
                SinkInner::Broadcast(shared) => SinkInner::Broadcast(Arc::clone(shared)),
            },
        }
    }
}
