// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Composable push-based asynchronous stream combinators.
//!
//! A rivulet [`EventStream`] delivers data and error events to listeners
//! attached through the subscription protocol (listen, pause, resume,
//! cancel) and is terminated by at most one done event. Operators are
//! extension traits; import [`prelude`] to get all of them:
//!
//! ```
//! use rivulet::prelude::*;
//! use rivulet::EventStream;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let totals = EventStream::from_iter([1, 2, 3, 4])
//!     .scan(0, |acc, v| async move { Ok::<_, StreamError>(acc + v) })
//!     .debounce(Duration::from_millis(5));
//! # drop(totals);
//! # }
//! ```
//!
//! Streams are single-subscription or broadcast; every operator's output
//! mirrors its primary input. See the crate-level docs of
//! [`rivulet_core`] for the protocol and controller details.

pub use rivulet_core::{
    BroadcastController, CancelFuture, CancellationToken, Event, EventHandlers, EventSink,
    EventStream, OutputController, Result, ResultExt, StreamController, StreamError, Subscription,
};
pub use rivulet_runtime::{OneShotTimer, Timer};
pub use rivulet_stream::{transform_events, trigger_aggregate, TransformHandlers};

pub mod prelude {
    //! Every operator extension trait plus the core stream types.

    pub use rivulet_core::{EventHandlers, EventStream, StreamError};
    pub use rivulet_stream::prelude::*;
    pub use rivulet_stream_time::prelude::*;
}
