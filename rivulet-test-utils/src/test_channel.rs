// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{BroadcastController, EventStream, StreamController, StreamError};

/// Push side of a test stream.
///
/// Wraps a controller so tests can feed data, errors and the close without
/// touching controller hooks.
pub struct TestSender<T> {
    push: PushSide<T>,
}

enum PushSide<T> {
    Single(StreamController<T>),
    Broadcast(BroadcastController<T>),
}

impl<T: Clone + Send + 'static> TestSender<T> {
    /// Push a data event.
    pub fn send(&self, value: T) {
        match &self.push {
            PushSide::Single(c) => c.add(value),
            PushSide::Broadcast(c) => c.add(value),
        }
    }

    /// Push an error event.
    pub fn send_error(&self, error: StreamError) {
        match &self.push {
            PushSide::Single(c) => c.add_error(error),
            PushSide::Broadcast(c) => c.add_error(error),
        }
    }

    /// Close the stream.
    pub fn close(&self) {
        match &self.push {
            PushSide::Single(c) => c.close(),
            PushSide::Broadcast(c) => c.close(),
        }
    }
}

/// A single-subscription test stream with its push side.
#[must_use]
pub fn test_channel<T: Clone + Send + 'static>() -> (TestSender<T>, EventStream<T>) {
    let controller = StreamController::new();
    let stream = controller.stream();
    (
        TestSender {
            push: PushSide::Single(controller),
        },
        stream,
    )
}

/// A broadcast test stream with its push side.
#[must_use]
pub fn broadcast_channel<T: Clone + Send + 'static>() -> (TestSender<T>, EventStream<T>) {
    let controller = BroadcastController::new();
    let stream = controller.stream();
    (
        TestSender {
            push: PushSide::Broadcast(controller),
        },
        stream,
    )
}

/// A trigger channel: a value-less stream fired by the returned sender.
#[must_use]
pub fn trigger_channel() -> (TestSender<()>, EventStream<()>) {
    test_channel()
}

impl TestSender<()> {
    /// Fire a value-less trigger event.
    pub fn fire(&self) {
        self.send(());
    }
}
