// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rivulet_core::{resolved_cancel, EventSink, EventStream};
use rivulet_runtime::OneShotTimer;
use rivulet_stream::transform::{transform_with, TransformHandlers};
use std::sync::Arc;
use std::time::Duration;

struct ThrottleState<T> {
    timer: Option<OneShotTimer>,
    pending: Option<T>,
    source_done: bool,
}

/// Open a throttle period: when it elapses, a pending trailing value is
/// emitted and the next period starts.
fn start_period<T: Clone + Send + 'static>(
    shared: &Arc<Mutex<ThrottleState<T>>>,
    sink: &EventSink<T>,
    duration: Duration,
) {
    let timer_shared = Arc::clone(shared);
    let timer_sink = sink.clone();
    // The state lock is held while the handle is stored, so the callback
    // cannot observe a half-initialized period.
    let mut state = shared.lock();
    let timer = OneShotTimer::start(duration, move || {
        let restart = {
            let mut state = timer_shared.lock();
            state.timer = None;
            match state.pending.take() {
                Some(value) => {
                    timer_sink.add(value);
                    if state.source_done {
                        timer_sink.close();
                        false
                    } else {
                        true
                    }
                }
                None => false,
            }
        };
        if restart {
            start_period(&timer_shared, &timer_sink, duration);
        }
    });
    state.timer = Some(timer);
}

/// Extension trait providing the [`throttle`](ThrottleExt::throttle)
/// operators.
pub trait ThrottleExt<T>
where
    T: Clone + Send + 'static,
{
    /// Emits the first value of each period and drops the rest.
    ///
    /// A value arriving while no period is open is emitted immediately and
    /// opens a period of `duration`; values inside the period are dropped.
    /// Errors pass through unthrottled.
    fn throttle(self, duration: Duration) -> EventStream<T>;

    /// [`throttle`](ThrottleExt::throttle) with trailing emission.
    ///
    /// With `trailing` set, the newest value received inside a period is
    /// remembered and emitted when the period ends, opening the next period.
    /// If the source closes while a trailing value is pending, the output
    /// stays open until the period's timer emits it, then closes.
    fn throttle_trailing(self, duration: Duration, trailing: bool) -> EventStream<T>;
}

impl<T> ThrottleExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn throttle(self, duration: Duration) -> EventStream<T> {
        self.throttle_trailing(duration, false)
    }

    fn throttle_trailing(self, duration: Duration, trailing: bool) -> EventStream<T> {
        let shared = Arc::new(Mutex::new(ThrottleState {
            timer: None,
            pending: None,
            source_done: false,
        }));

        let data_shared = Arc::clone(&shared);
        let done_shared = Arc::clone(&shared);
        let cancel_shared = Arc::clone(&shared);
        transform_with(
            self,
            TransformHandlers::new(move |v, sink: &EventSink<T>| {
                let emit = {
                    let mut state = data_shared.lock();
                    if state.timer.is_some() {
                        if trailing {
                            state.pending = Some(v);
                        }
                        None
                    } else {
                        Some(v)
                    }
                };
                if let Some(value) = emit {
                    sink.add(value);
                    start_period(&data_shared, sink, duration);
                }
            })
            .on_done(move |sink| {
                let close_now = {
                    let mut state = done_shared.lock();
                    state.source_done = true;
                    if state.pending.is_none() {
                        state.timer = None;
                        true
                    } else {
                        // The running period's timer emits the pending value
                        // and closes.
                        false
                    }
                };
                if close_now {
                    sink.close();
                }
            }),
            Some(Box::new(move || {
                let mut state = cancel_shared.lock();
                state.timer = None;
                state.pending = None;
                resolved_cancel()
            })),
        )
    }
}
