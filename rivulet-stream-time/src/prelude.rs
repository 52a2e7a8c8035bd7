// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! One-stop import for the timed operator extension traits.

pub use crate::audit::AuditExt;
pub use crate::debounce::DebounceExt;
pub use crate::debounce_buffer::DebounceBufferExt;
pub use crate::throttle::ThrottleExt;
