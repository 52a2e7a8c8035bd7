// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rivulet_core::{resolved_cancel, EventSink, EventStream};
use rivulet_runtime::OneShotTimer;
use rivulet_stream::transform::{transform_with, TransformHandlers};
use std::sync::Arc;
use std::time::Duration;

struct AuditState<T> {
    recent: Option<T>,
    timer: Option<OneShotTimer>,
    source_done: bool,
}

/// Extension trait providing the [`audit`](AuditExt::audit) operator.
pub trait AuditExt<T>
where
    T: Clone + Send + 'static,
{
    /// Emits the latest value at the end of each period.
    ///
    /// The first value after an emission (or after start) opens a period of
    /// `duration`; values inside the period overwrite each other and the
    /// newest one is emitted when the period ends. If the source closes
    /// while a period is running, the close is deferred until the timer has
    /// fired.
    fn audit(self, duration: Duration) -> EventStream<T>;
}

impl<T> AuditExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn audit(self, duration: Duration) -> EventStream<T> {
        let shared = Arc::new(Mutex::new(AuditState {
            recent: None,
            timer: None,
            source_done: false,
        }));

        let data_shared = Arc::clone(&shared);
        let done_shared = Arc::clone(&shared);
        let cancel_shared = Arc::clone(&shared);
        transform_with(
            self,
            TransformHandlers::new(move |v, sink: &EventSink<T>| {
                let mut state = data_shared.lock();
                state.recent = Some(v);
                if state.timer.is_none() {
                    let timer_shared = Arc::clone(&data_shared);
                    let timer_sink = sink.clone();
                    let timer = OneShotTimer::start(duration, move || {
                        let close = {
                            let mut state = timer_shared.lock();
                            state.timer = None;
                            if let Some(value) = state.recent.take() {
                                timer_sink.add(value);
                            }
                            state.source_done
                        };
                        if close {
                            timer_sink.close();
                        }
                    });
                    state.timer = Some(timer);
                }
            })
            .on_done(move |sink| {
                let close_now = {
                    let mut state = done_shared.lock();
                    state.source_done = true;
                    state.timer.is_none()
                };
                if close_now {
                    sink.close();
                }
            }),
            Some(Box::new(move || {
                let mut state = cancel_shared.lock();
                state.timer = None;
                state.recent = None;
                resolved_cancel()
            })),
        )
    }
}
