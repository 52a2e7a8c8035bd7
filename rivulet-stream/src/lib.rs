// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Operator families for rivulet event streams.
//!
//! Every operator is an extension trait on
//! [`EventStream`](rivulet_core::EventStream); import the prelude to get all
//! of them:
//!
//! ```
//! use rivulet_stream::prelude::*;
//! ```
//!
//! Two primitives underpin the families: the handler transformer
//! ([`transform`]) for single-input operators, and the trigger-aggregate
//! ([`aggregate`]) for flush-on-signal operators. The rest implement the
//! subscription protocol directly.

pub mod aggregate;
pub mod async_map;
pub mod async_map_buffer;
pub mod async_map_sample;
pub mod async_where;
pub mod buffer;
pub mod combine_latest;
pub mod distinct_when;
pub mod expand;
pub mod followed_by;
pub mod merge;
pub mod prelude;
pub mod sample;
pub mod scan;
pub mod start_with;
pub mod switch;
pub mod take_until;
pub mod tap;
pub mod transform;
pub mod where_type;

pub use aggregate::trigger_aggregate;
pub use async_map::ConcurrentAsyncMapExt;
pub use async_map_buffer::AsyncMapBufferExt;
pub use async_map_sample::AsyncMapSampleExt;
pub use async_where::AsyncWhereExt;
pub use buffer::BufferExt;
pub use combine_latest::CombineLatestExt;
pub use distinct_when::DistinctWhenExt;
pub use expand::{ConcurrentAsyncExpandExt, SequentialAsyncExpandExt};
pub use followed_by::FollowedByExt;
pub use merge::MergeExt;
pub use sample::SampleExt;
pub use scan::ScanExt;
pub use start_with::StartWithExt;
pub use switch::{SwitchLatestExt, SwitchMapExt};
pub use take_until::TakeUntilExt;
pub use tap::TapExt;
pub use transform::{transform_events, TransformHandlers};
pub use where_type::WhereTypeExt;
