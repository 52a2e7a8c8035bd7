// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Timer and task primitives for rivulet.
//!
//! The timed operators consume clocks only through [`Timer`] and
//! [`OneShotTimer`]; the default implementation is tokio's clock, which the
//! tests drive deterministically with `tokio::time::pause`/`advance`.

pub mod oneshot;
pub mod task;
pub mod timer;

pub use oneshot::OneShotTimer;
pub use task::spawn;
pub use timer::{DefaultTimer, Sleep, Timer, TokioTimer};
