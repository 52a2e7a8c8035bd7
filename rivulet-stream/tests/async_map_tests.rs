// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{EventStream, StreamError};
use rivulet_stream::prelude::*;
use rivulet_test_utils::{test_channel, EventRecorder};
use std::sync::Arc;
use tokio::sync::Notify;

#[tokio::test]
async fn concurrent_async_map_emits_results_as_they_complete() -> anyhow::Result<()> {
    // Arrange: the first conversion finishes only after the second.
    let gate = Arc::new(Notify::new());
    let release = Arc::clone(&gate);
    let mapped = EventStream::from_iter([1, 2]).concurrent_async_map(move |v| {
        let gate = Arc::clone(&gate);
        async move {
            if v == 1 {
                gate.notified().await;
            }
            Ok::<_, StreamError>(v * 10)
        }
    });
    let (mut recorder, _sub) = EventRecorder::listen(&mapped);

    // Act & Assert: completion order, not input order.
    recorder.expect_data(20).await;
    recorder.expect_nothing().await;
    release.notify_one();
    recorder.expect_data(10).await;
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn concurrent_async_map_counts_failures_toward_completion() -> anyhow::Result<()> {
    // Arrange
    let mapped = EventStream::from_iter([1, 2, 3]).concurrent_async_map(|v| async move {
        if v == 2 {
            Err(StreamError::callback("failed conversion"))
        } else {
            Ok(v)
        }
    });
    let (mut recorder, _sub) = EventRecorder::listen(&mapped);

    // Assert: error does not stall the close accounting.
    recorder.expect_data(1).await;
    recorder.expect_error().await;
    recorder.expect_data(3).await;
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn concurrent_async_map_holds_the_output_open_for_pending_work() -> anyhow::Result<()> {
    // Arrange
    let gate = Arc::new(Notify::new());
    let release = Arc::clone(&gate);
    let (tx, stream) = test_channel();
    let mapped = stream.concurrent_async_map(move |v: i32| {
        let gate = Arc::clone(&gate);
        async move {
            gate.notified().await;
            Ok::<_, StreamError>(v)
        }
    });
    let (mut recorder, _sub) = EventRecorder::listen(&mapped);

    // Act: the source closes while one conversion is in flight.
    tx.send(7);
    tx.close();

    // Assert
    recorder.expect_nothing().await;
    release.notify_one();
    recorder.expect_data(7).await;
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn async_map_buffer_converts_first_value_alone() -> anyhow::Result<()> {
    // Arrange
    let gate = Arc::new(Notify::new());
    let release = Arc::clone(&gate);
    let (tx, stream) = test_channel();
    let mapped = stream.async_map_buffer(move |batch: Vec<i32>| {
        let gate = Arc::clone(&gate);
        async move {
            gate.notified().await;
            Ok::<_, StreamError>(batch)
        }
    });
    let (mut recorder, _sub) = EventRecorder::listen(&mapped);

    // Act: 1 goes through alone; 2 and 3 collect while it is converted.
    tx.send(1);
    tx.send(2);
    tx.send(3);
    recorder.expect_nothing().await;
    release.notify_one();
    recorder.expect_data(vec![1]).await;
    release.notify_one();

    // Assert
    recorder.expect_data(vec![2, 3]).await;

    Ok(())
}

#[tokio::test]
async fn async_map_buffer_preserves_source_order() -> anyhow::Result<()> {
    // Arrange
    let mapped = EventStream::from_iter(1..=5).async_map_buffer(|batch: Vec<i32>| async move {
        Ok::<_, StreamError>(batch.iter().sum::<i32>())
    });
    let (mut recorder, _sub) = EventRecorder::listen(&mapped);

    // Assert: whatever the batching, the grand total is stable and ordered.
    let batches = recorder.drain_data().await;
    assert_eq!(batches.iter().sum::<i32>(), 15);
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn async_map_sample_keeps_only_newest_while_busy() -> anyhow::Result<()> {
    // Arrange
    let gate = Arc::new(Notify::new());
    let release = Arc::clone(&gate);
    let (tx, stream) = test_channel();
    let mapped = stream.async_map_sample(move |v: i32| {
        let gate = Arc::clone(&gate);
        async move {
            gate.notified().await;
            Ok::<_, StreamError>(v)
        }
    });
    let (mut recorder, _sub) = EventRecorder::listen(&mapped);

    // Act: 1 starts converting; 2 is overwritten by 3.
    tx.send(1);
    tx.send(2);
    tx.send(3);
    recorder.expect_nothing().await;
    release.notify_one();
    recorder.expect_data(1).await;
    release.notify_one();

    // Assert
    recorder.expect_data(3).await;

    Ok(())
}
