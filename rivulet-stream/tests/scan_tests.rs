// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{EventStream, StreamError};
use rivulet_stream::prelude::*;
use rivulet_test_utils::{broadcast_channel, test_channel, EventRecorder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn scan_emits_running_sums() -> anyhow::Result<()> {
    // Arrange
    let summed = EventStream::from_iter([1, 2, 3, 4])
        .scan(0, |acc, v| async move { Ok::<_, StreamError>(acc + v) });
    let (mut recorder, _sub) = EventRecorder::listen(&summed);

    // Assert
    assert_eq!(recorder.drain_data().await, vec![1, 3, 6, 10]);
    Ok(())
}

#[tokio::test]
async fn scan_last_value_equals_fold() -> anyhow::Result<()> {
    // Arrange
    let source: Vec<i32> = vec![5, 8, 13, 21];
    let expected = source.iter().product::<i32>();
    let scanned = EventStream::from_iter(source)
        .scan(1, |acc, v| async move { Ok::<_, StreamError>(acc * v) });
    let (mut recorder, _sub) = EventRecorder::listen(&scanned);

    // Assert
    let values = recorder.drain_data().await;
    assert_eq!(values.last().copied(), Some(expected));
    Ok(())
}

#[tokio::test]
async fn scan_keeps_accumulator_across_combine_errors() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = test_channel();
    let scanned = stream.scan(0, |acc, v: i32| async move {
        if v < 0 {
            Err(StreamError::callback("negative input"))
        } else {
            Ok(acc + v)
        }
    });
    let (mut recorder, _sub) = EventRecorder::listen(&scanned);

    // Act & Assert
    tx.send(1);
    recorder.expect_data(1).await;
    tx.send(-1);
    recorder.expect_error().await;
    tx.send(2);
    recorder.expect_data(3).await;

    Ok(())
}

#[tokio::test]
async fn scan_runs_combine_once_per_event_on_broadcast() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = broadcast_channel();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let scanned = stream.scan(0, move |acc, v: i32| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok::<_, StreamError>(acc + v) }
    });
    let (mut first, _sub_a) = EventRecorder::listen(&scanned);
    let (mut second, _sub_b) = EventRecorder::listen(&scanned);

    // Act
    tx.send(4);

    // Assert
    first.expect_data(4).await;
    second.expect_data(4).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn scan_defers_done_until_pending_combine_completes() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = test_channel();
    let scanned = stream.scan(0, |acc, v: i32| async move {
        tokio::task::yield_now().await;
        Ok::<_, StreamError>(acc + v)
    });
    let (mut recorder, _sub) = EventRecorder::listen(&scanned);

    // Act: close right behind the value.
    tx.send(5);
    tx.close();

    // Assert: the result still comes out before done.
    recorder.expect_data(5).await;
    recorder.expect_done().await;

    Ok(())
}
