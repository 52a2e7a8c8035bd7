// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! One-stop import for every operator extension trait.

pub use crate::async_map::ConcurrentAsyncMapExt;
pub use crate::async_map_buffer::AsyncMapBufferExt;
pub use crate::async_map_sample::AsyncMapSampleExt;
pub use crate::async_where::AsyncWhereExt;
pub use crate::buffer::BufferExt;
pub use crate::combine_latest::CombineLatestExt;
pub use crate::distinct_when::DistinctWhenExt;
pub use crate::expand::{ConcurrentAsyncExpandExt, SequentialAsyncExpandExt};
pub use crate::followed_by::FollowedByExt;
pub use crate::merge::MergeExt;
pub use crate::sample::SampleExt;
pub use crate::scan::ScanExt;
pub use crate::start_with::StartWithExt;
pub use crate::switch::{SwitchLatestExt, SwitchMapExt};
pub use crate::take_until::TakeUntilExt;
pub use crate::tap::TapExt;
pub use crate::where_type::WhereTypeExt;
