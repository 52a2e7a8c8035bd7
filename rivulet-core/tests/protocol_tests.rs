// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Subscription-protocol behavior visible through the public surface.

use parking_lot::Mutex;
use rivulet_core::{
    BroadcastController, EventHandlers, EventStream, StreamController, StreamError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn pause_is_counted_and_needs_matching_resumes() {
    let controller = StreamController::new();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let subscription = controller
        .stream()
        .listen(EventHandlers::new().on_data(move |_: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

    subscription.pause();
    subscription.pause();
    controller.add(1);
    settle().await;
    assert_eq!(seen.load(Ordering::SeqCst), 0);

    subscription.resume();
    settle().await;
    assert_eq!(seen.load(Ordering::SeqCst), 0);

    subscription.resume();
    settle().await;
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_completion_resolves_and_is_idempotent() {
    let controller = StreamController::<i32>::new();
    let subscription = controller.stream().listen(EventHandlers::new());

    subscription.cancel().await.unwrap();
    subscription.cancel().await.unwrap();
}

#[tokio::test]
#[should_panic(expected = "cannot accept another listener")]
async fn double_listen_on_single_subscription_panics() {
    let controller = StreamController::<i32>::new();
    let stream = controller.stream();
    stream.listen(EventHandlers::new());
    stream.listen(EventHandlers::new());
}

#[tokio::test]
async fn try_listen_reports_already_listened() {
    let stream = EventStream::from_iter([1]);
    stream.listen(EventHandlers::new());
    assert!(matches!(
        stream.try_listen(EventHandlers::new()),
        Err(StreamError::AlreadyListened)
    ));
}

#[tokio::test]
async fn broadcast_allows_cancel_and_relisten() {
    let controller = BroadcastController::new();
    let stream = controller.stream();

    let first = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&first);
    let subscription = stream.listen(EventHandlers::new().on_data(move |v: i32| {
        sink.lock().push(v);
    }));
    controller.add(1);
    settle().await;
    subscription.cancel().await.unwrap();

    let second = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&second);
    stream.listen(EventHandlers::new().on_data(move |v: i32| {
        sink.lock().push(v);
    }));
    controller.add(2);
    settle().await;

    assert_eq!(*first.lock(), vec![1]);
    assert_eq!(*second.lock(), vec![2]);
}

#[tokio::test]
async fn errors_do_not_terminate_a_stream() {
    let controller = StreamController::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let data_sink = Arc::clone(&events);
    let error_sink = Arc::clone(&events);
    controller.stream().listen(
        EventHandlers::new()
            .on_data(move |v: i32| data_sink.lock().push(format!("data {v}")))
            .on_error(move |e| error_sink.lock().push(format!("error {e}"))),
    );

    controller.add(1);
    controller.add_error(StreamError::processing("transient"));
    controller.add(2);
    settle().await;

    let recorded = events.lock().clone();
    assert_eq!(recorded.len(), 3);
    assert!(recorded[1].starts_with("error"));
}
