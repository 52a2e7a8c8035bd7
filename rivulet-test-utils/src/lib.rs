// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Test utilities for rivulet streams.
//!
//! [`test_channel`]/[`broadcast_channel`] build streams tests can push
//! into; [`EventRecorder`] collects output events with settle-then-assert
//! helpers that stay deterministic under `tokio::time::pause`.

pub mod recorder;
pub mod test_channel;

pub use recorder::{settle, EventRecorder};
pub use test_channel::{broadcast_channel, test_channel, trigger_channel, TestSender};
