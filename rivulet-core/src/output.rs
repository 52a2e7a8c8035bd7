// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Uniform output side for operators.
//!
//! Every combinator produces an output stream whose broadcast-ness mirrors
//! its primary input. [`OutputController`] hides the two controller kinds
//! behind one surface so operator code branches on single vs broadcast in
//! exactly one place: construction.
//!
//! Hook mapping:
//! - *single*: `on_listen` fires for the one listen, `on_cancel` for its
//!   cancel, `on_pause`/`on_resume` delegate flow control upstream.
//! - *broadcast*: `on_listen` fires on every 0 → 1 subscriber transition,
//!   `on_cancel` on every 1 → 0 transition; pause never reaches the source.

use crate::broadcast::BroadcastController;
use crate::controller::StreamController;
use crate::sink::EventSink;
use crate::stream::EventStream;
use crate::subscription::CancelFuture;
use rivulet_error::StreamError;

pub struct OutputController<T> {
    kind: Kind<T>,
}

enum Kind<T> {
    Single(StreamController<T>),
    Broadcast(BroadcastController<T>),
}

impl<T: Clone + Send + 'static> OutputController<T> {
    /// Create an output controller matching the primary input's mode.
    #[must_use]
    pub fn new(broadcast: bool) -> Self {
        Self {
            kind: if broadcast {
                Kind::Broadcast(BroadcastController::new())
            } else {
                Kind::Single(StreamController::new())
            },
        }
    }

    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        matches!(self.kind, Kind::Broadcast(_))
    }

    #[must_use]
    pub fn sink(&self) -> EventSink<T> {
        match &self.kind {
            Kind::Single(c) => c.sink(),
            Kind::Broadcast(c) => c.sink(),
        }
    }

    #[must_use]
    pub fn stream(&self) -> EventStream<T> {
        match &self.kind {
            Kind::Single(c) => c.stream(),
            Kind::Broadcast(c) => c.stream(),
        }
    }

    pub fn add(&self, value: T) {
        match &self.kind {
            Kind::Single(c) => c.add(value),
            Kind::Broadcast(c) => c.add(value),
        }
    }

    pub fn add_error(&self, error: StreamError) {
        match &self.kind {
            Kind::Single(c) => c.add_error(error),
            Kind::Broadcast(c) => c.add_error(error),
        }
    }

    pub fn close(&self) {
        match &self.kind {
            Kind::Single(c) => c.close(),
            Kind::Broadcast(c) => c.close(),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        match &self.kind {
            Kind::Single(c) => c.is_closed(),
            Kind::Broadcast(c) => c.is_closed(),
        }
    }

    /// Hook for the listen (single) or each first-listen (broadcast).
    pub fn set_on_listen(&self, mut hook: impl FnMut() + Send + 'static) {
        match &self.kind {
            Kind::Single(c) => c.set_on_listen(move || hook()),
            Kind::Broadcast(c) => c.set_on_first_listen(hook),
        }
    }

    /// Hook for pause requests. Broadcast outputs never propagate pause.
    pub fn set_on_pause(&self, hook: impl Fn() + Send + Sync + 'static) {
        if let Kind::Single(c) = &self.kind {
            c.set_on_pause(hook);
        }
    }

    /// Hook for resume requests. Broadcast outputs never propagate resume.
    pub fn set_on_resume(&self, hook: impl Fn() + Send + Sync + 'static) {
        if let Kind::Single(c) = &self.kind {
            c.set_on_resume(hook);
        }
    }

    /// Hook for the cancel (single) or each last-cancel (broadcast).
    pub fn set_on_cancel(&self, mut hook: impl FnMut() -> CancelFuture + Send + 'static) {
        match &self.kind {
            Kind::Single(c) => c.set_on_cancel(move || hook()),
            Kind::Broadcast(c) => c.set_on_last_cancel(hook),
        }
    }
}
