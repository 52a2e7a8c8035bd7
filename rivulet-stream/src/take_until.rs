// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use rivulet_core::{
    join_cancels, CancellationToken, EventHandlers, EventStream, OutputController, Subscription,
};
use rivulet_runtime::spawn;
use std::future::Future;
use std::sync::Arc;

/// Extension trait providing the [`take_until`](TakeUntilExt::take_until)
/// operator.
pub trait TakeUntilExt<T>
where
    T: Clone + Send + 'static,
{
    /// Forwards the source until `trigger` completes, then closes.
    ///
    /// Completion of the trigger closes the output and cancels the source;
    /// events already accepted into the pipeline are still delivered before
    /// the close, which distinguishes this from canceling the subscription.
    fn take_until<F>(self, trigger: F) -> EventStream<T>
    where
        F: Future<Output = ()> + Send + 'static;
}

impl<T> TakeUntilExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn take_until<F>(self, trigger: F) -> EventStream<T>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let output = OutputController::new(self.is_broadcast());
        let sink = output.sink();
        let upstream: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let token = CancellationToken::new();

        let mut pending = Some((self, trigger, sink));
        let listen_upstream = Arc::clone(&upstream);
        let watcher_token = token.clone();
        output.set_on_listen(move || {
            let Some((source, trigger, sink)) = pending.take() else {
                return;
            };
            let data_sink = sink.clone();
            let error_sink = sink.clone();
            let done_sink = sink.clone();
            let subscription = source.listen(
                EventHandlers::new()
                    .on_data(move |v| data_sink.add(v))
                    .on_error(move |e| error_sink.add_error(e))
                    .on_done(move || done_sink.close()),
            );
            *listen_upstream.lock() = Some(subscription);

            let watcher_upstream = Arc::clone(&listen_upstream);
            let watcher_token = watcher_token.clone();
            spawn(async move {
                tokio::select! {
                    () = watcher_token.cancelled() => {}
                    () = trigger => {
                        sink.close();
                        if let Some(subscription) = watcher_upstream.lock().take() {
                            let cancel = subscription.cancel();
                            spawn(async move {
                                let _ = cancel.await;
                            });
                        }
                    }
                }
            });
        });

        let pause_upstream = Arc::clone(&upstream);
        output.set_on_pause(move || {
            if let Some(subscription) = &*pause_upstream.lock() {
                subscription.pause();
            }
        });
        let resume_upstream = Arc::clone(&upstream);
        output.set_on_resume(move || {
            if let Some(subscription) = &*resume_upstream.lock() {
                subscription.resume();
            }
        });

        if !output.is_broadcast() {
            let cancel_upstream = Arc::clone(&upstream);
            output.set_on_cancel(move || {
                token.cancel();
                let mut cancels = Vec::new();
                if let Some(subscription) = cancel_upstream.lock().take() {
                    cancels.push(subscription.cancel());
                }
                join_cancels(cancels)
            });
        }

        output.stream()
    }
}
