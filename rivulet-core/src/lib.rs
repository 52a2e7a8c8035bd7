// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Core types for rivulet: events, the subscription protocol, stream
//! controllers and sinks.
//!
//! A [`EventStream`] delivers [`Event`]s (data, error, done) to handlers
//! attached via [`EventStream::listen`], which returns a [`Subscription`]
//! with pause/resume/cancel. Streams are produced by the two controller
//! kinds, [`StreamController`] (single-subscription) and
//! [`BroadcastController`] (fan-out), or by the source constructors on
//! `EventStream`. Operators build their output side with
//! [`OutputController`] and write through an [`EventSink`].

mod broadcast;
mod controller;
mod event;
mod logging;
mod output;
mod sink;
mod stream;
mod subscriber;
mod subscription;

pub use broadcast::BroadcastController;
pub use controller::StreamController;
pub use event::{Event, EventHandlers};
pub use output::OutputController;
pub use sink::EventSink;
pub use stream::EventStream;
pub use subscription::{join_cancels, resolved_cancel, CancelFuture, Subscription};

// Re-exported so downstream crates share one error surface.
pub use rivulet_error::{Result, ResultExt, StreamError};

// Cooperative teardown for pump tasks, channel forwarders and one-shot
// timers.
pub use tokio_util::sync::CancellationToken;
