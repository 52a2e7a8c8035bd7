// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Burst-quieting operators.
//!
//! A *burst* is a run of events each separated from the previous by less
//! than the debounce duration. `debounce` reduces a burst to its last (or
//! first) element; `debounce_buffer` collects the whole burst into a list.

use parking_lot::Mutex;
use rivulet_core::{resolved_cancel, EventSink, EventStream};
use rivulet_runtime::OneShotTimer;
use rivulet_stream::transform::{transform_with, TransformHandlers};
use std::sync::Arc;
use std::time::Duration;

struct DebounceState<A> {
    so_far: Option<A>,
    timer: Option<OneShotTimer>,
    emitted_leading: bool,
    source_done: bool,
}

/// Shared state machine behind `debounce` and `debounce_buffer`.
///
/// `collect` folds each event into the burst accumulator (`debounce`
/// replaces, `debounce_buffer` appends).
pub(crate) fn debounce_impl<T, A, F>(
    source: EventStream<T>,
    duration: Duration,
    leading: bool,
    trailing: bool,
    mut collect: F,
) -> EventStream<A>
where
    T: Clone + Send + 'static,
    A: Clone + Send + 'static,
    F: FnMut(T, Option<A>) -> A + Send + 'static,
{
    let shared = Arc::new(Mutex::new(DebounceState::<A> {
        so_far: None,
        timer: None,
        emitted_leading: false,
        source_done: false,
    }));

    let data_shared = Arc::clone(&shared);
    let done_shared = Arc::clone(&shared);
    let cancel_shared = Arc::clone(&shared);
    transform_with(
        source,
        TransformHandlers::new(move |v, sink: &EventSink<A>| {
            let mut state = data_shared.lock();
            let burst_open = state.timer.is_some();
            // Restart the quiet-period timer; replacing the handle cancels
            // the old one.
            state.timer = None;
            let acc = state.so_far.take();
            let folded = collect(v, acc);

            if leading && !burst_open {
                sink.add(folded.clone());
                state.emitted_leading = true;
            } else {
                state.emitted_leading = false;
            }
            state.so_far = Some(folded);

            let timer_shared = Arc::clone(&data_shared);
            let timer_sink = sink.clone();
            let timer = OneShotTimer::start(duration, move || {
                let (emit, close) = {
                    let mut state = timer_shared.lock();
                    state.timer = None;
                    let emit = if trailing && !state.emitted_leading {
                        state.so_far.take()
                    } else {
                        state.so_far = None;
                        None
                    };
                    state.emitted_leading = false;
                    (emit, state.source_done)
                };
                if let Some(value) = emit {
                    timer_sink.add(value);
                }
                if close {
                    timer_sink.close();
                }
            });
            state.timer = Some(timer);
        })
        .on_done(move |sink| {
            let close_now = {
                let mut state = done_shared.lock();
                state.source_done = true;
                let pending_trailing =
                    state.timer.is_some() && trailing && !state.emitted_leading;
                if !pending_trailing {
                    state.timer = None;
                }
                !pending_trailing
            };
            if close_now {
                sink.close();
            }
        }),
        Some(Box::new(move || {
            let mut state = cancel_shared.lock();
            state.timer = None;
            state.so_far = None;
            resolved_cancel()
        })),
    )
}

/// Extension trait providing the [`debounce`](DebounceExt::debounce)
/// operators.
pub trait DebounceExt<T>
where
    T: Clone + Send + 'static,
{
    /// Emits the last value of a burst once `duration` of silence follows.
    ///
    /// Each event restarts the timer; only the newest value survives. If the
    /// source closes mid-burst the pending value is still emitted when the
    /// timer fires, then the output closes.
    fn debounce(self, duration: Duration) -> EventStream<T>;

    /// [`debounce`](DebounceExt::debounce) with explicit edge selection.
    ///
    /// With `leading`, the first value of a burst is emitted immediately;
    /// with `trailing`, the last value is emitted after the quiet period. A
    /// burst whose only value was already emitted as leading produces no
    /// trailing emission.
    fn debounce_edges(self, duration: Duration, leading: bool, trailing: bool) -> EventStream<T>;
}

impl<T> DebounceExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn debounce(self, duration: Duration) -> EventStream<T> {
        self.debounce_edges(duration, false, true)
    }

    fn debounce_edges(self, duration: Duration, leading: bool, trailing: bool) -> EventStream<T> {
        debounce_impl(self, duration, leading, trailing, |v, _| v)
    }
}
