// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{Event, EventHandlers, EventStream, Subscription};
use std::fmt::Debug;
use tokio::sync::mpsc;

/// Number of scheduler turns [`settle`] yields for.
///
/// Events cross one task hop per pipeline stage; 64 turns comfortably
/// drains any pipeline the tests build.
const SETTLE_TURNS: usize = 64;

/// Let every pump task and spawned callback in the pipeline run.
pub async fn settle() {
    for _ in 0..SETTLE_TURNS {
        tokio::task::yield_now().await;
    }
}

/// Collects a stream's events for step-by-step assertions.
///
/// All expectation helpers first [`settle`] the pipeline, then inspect the
/// recorded queue, so tests stay deterministic under a paused tokio clock:
///
/// ```
/// use rivulet_core::EventStream;
/// use rivulet_test_utils::EventRecorder;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (mut recorder, _sub) = EventRecorder::listen(&EventStream::from_iter([1, 2]));
/// recorder.expect_data(1).await;
/// recorder.expect_data(2).await;
/// recorder.expect_done().await;
/// # }
/// ```
pub struct EventRecorder<T> {
    events: mpsc::UnboundedReceiver<Event<T>>,
    /// Set when a drain consumed the terminal event, so a later
    /// [`expect_done`](Self::expect_done) still passes.
    done_seen: bool,
}

impl<T: Clone + Send + 'static> EventRecorder<T> {
    /// Listen to `stream`, recording every event.
    pub fn listen(stream: &EventStream<T>) -> (Self, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        let data_tx = tx.clone();
        let error_tx = tx.clone();
        let done_tx = tx;
        let subscription = stream.listen(
            EventHandlers::new()
                .on_data(move |v| {
                    let _ = data_tx.send(Event::Data(v));
                })
                .on_error(move |e| {
                    let _ = error_tx.send(Event::Error(e));
                })
                .on_done(move || {
                    let _ = done_tx.send(Event::Done);
                }),
        );
        (
            Self {
                events: rx,
                done_seen: false,
            },
            subscription,
        )
    }

    /// Next recorded event, if any arrived by now.
    pub async fn next_event(&mut self) -> Option<Event<T>> {
        settle().await;
        self.events.try_recv().ok()
    }

    /// Assert the next event is `Data(expected)`.
    pub async fn expect_data(&mut self, expected: T)
    where
        T: Debug + PartialEq,
    {
        match self.next_event().await {
            Some(Event::Data(v)) => assert_eq!(v, expected),
            other => panic!("expected Data({expected:?}), got {other:?}"),
        }
    }

    /// Assert the next event is an error.
    pub async fn expect_error(&mut self)
    where
        T: Debug,
    {
        match self.next_event().await {
            Some(Event::Error(_)) => {}
            other => panic!("expected an error event, got {other:?}"),
        }
    }

    /// Assert the stream has terminated (directly or during a drain).
    pub async fn expect_done(&mut self)
    where
        T: Debug,
    {
        if self.done_seen {
            return;
        }
        match self.next_event().await {
            Some(Event::Done) => {}
            other => panic!("expected Done, got {other:?}"),
        }
    }

    /// Assert nothing has been emitted.
    pub async fn expect_nothing(&mut self)
    where
        T: Debug,
    {
        settle().await;
        if let Ok(event) = self.events.try_recv() {
            panic!("expected no event, got {event:?}");
        }
    }

    /// Drain every data event recorded so far, failing on errors.
    pub async fn drain_data(&mut self) -> Vec<T>
    where
        T: Debug,
    {
        settle().await;
        let mut values = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            match event {
                Event::Data(v) => values.push(v),
                Event::Done => {
                    self.done_seen = true;
                    break;
                }
                Event::Error(e) => panic!("unexpected error while draining: {e}"),
            }
        }
        values
    }
}
