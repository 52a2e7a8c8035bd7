// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rivulet_core::{
    join_cancels, EventHandlers, EventStream, OutputController, Subscription,
};
use std::sync::Arc;

struct MergeShared {
    subscriptions: Mutex<Vec<Subscription>>,
    active: Mutex<usize>,
}

/// Extension trait providing the [`merge`](MergeExt::merge) operators.
pub trait MergeExt<T>
where
    T: Clone + Send + 'static,
{
    /// Interleaves this stream with `other` in arrival order.
    fn merge(self, other: EventStream<T>) -> EventStream<T>;

    /// Interleaves this stream with every stream in `others`.
    ///
    /// All inputs are subscribed when the output is listened to; every event
    /// from any input is forwarded as it arrives. The output closes once all
    /// inputs are done. Pause, resume and cancel reach every input; a
    /// broadcast output keeps its input subscriptions across listener churn
    /// (a single-subscription input could not be relistened anyway).
    fn merge_all(self, others: Vec<EventStream<T>>) -> EventStream<T>;
}

impl<T> MergeExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn merge(self, other: EventStream<T>) -> EventStream<T> {
        self.merge_all(vec![other])
    }

    fn merge_all(self, others: Vec<EventStream<T>>) -> EventStream<T> {
        let output = OutputController::new(self.is_broadcast());
        let sink = output.sink();

        let mut inputs = Vec::with_capacity(others.len() + 1);
        inputs.push(self);
        inputs.extend(others);

        let shared = Arc::new(MergeShared {
            subscriptions: Mutex::new(Vec::new()),
            active: Mutex::new(inputs.len()),
        });

        let mut pending = Some((inputs, sink));
        let listen_shared = Arc::clone(&shared);
        output.set_on_listen(move || {
            let Some((inputs, sink)) = pending.take() else {
                return;
            };
            let mut subscriptions = Vec::with_capacity(inputs.len());
            for input in inputs {
                let data_sink = sink.clone();
                let error_sink = sink.clone();
                let done_shared = Arc::clone(&listen_shared);
                let done_sink = sink.clone();
                subscriptions.push(input.listen(
                    EventHandlers::new()
                        .on_data(move |v| data_sink.add(v))
                        .on_error(move |e| error_sink.add_error(e))
                        .on_done(move || {
                            let all_done = {
                                let mut active = done_shared.active.lock();
                                *active -= 1;
                                *active == 0
                            };
                            if all_done {
                                done_sink.close();
                            }
                        }),
                ));
            }
            *listen_shared.subscriptions.lock() = subscriptions;
        });

        let pause_shared = Arc::clone(&shared);
        output.set_on_pause(move || {
            for subscription in pause_shared.subscriptions.lock().iter() {
                subscription.pause();
            }
        });
        let resume_shared = Arc::clone(&shared);
        output.set_on_resume(move || {
            for subscription in resume_shared.subscriptions.lock().iter() {
                subscription.resume();
            }
        });

        if !output.is_broadcast() {
            let cancel_shared = Arc::clone(&shared);
            output.set_on_cancel(move || {
                let cancels: Vec<_> = cancel_shared
                    .subscriptions
                    .lock()
                    .drain(..)
                    .map(|s| s.cancel())
                    .collect();
                join_cancels(cancels)
            });
        }

        output.stream()
    }
}
