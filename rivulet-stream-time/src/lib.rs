// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Duration-driven rate limiting operators.
//!
//! All four operators share the timer discipline: one-shot timers started
//! lazily on the first relevant event, nulled when they fire, and actively
//! canceled when the output terminates or the state machine discards them.

pub mod audit;
pub mod debounce;
pub mod debounce_buffer;
pub mod prelude;
pub mod throttle;

pub use audit::AuditExt;
pub use debounce::DebounceExt;
pub use debounce_buffer::DebounceBufferExt;
pub use throttle::ThrottleExt;
