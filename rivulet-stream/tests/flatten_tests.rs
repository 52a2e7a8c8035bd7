// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::EventStream;
use rivulet_stream::prelude::*;
use rivulet_test_utils::{settle, test_channel, EventRecorder};

#[tokio::test]
async fn switch_map_flattens_sequential_inners() -> anyhow::Result<()> {
    // Arrange
    let (outer_tx, outer) = test_channel();
    let switched = outer.switch_map(|values: Vec<i32>| EventStream::from_iter(values));
    let (mut recorder, _sub) = EventRecorder::listen(&switched);

    // Act: let each inner drain before the next outer event.
    outer_tx.send(vec![1, 2, 3]);
    settle().await;
    outer_tx.send(vec![4, 5, 6]);
    settle().await;
    outer_tx.close();

    // Assert
    assert_eq!(recorder.drain_data().await, vec![1, 2, 3, 4, 5, 6]);
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn switch_map_cancels_the_previous_inner() -> anyhow::Result<()> {
    // Arrange
    let (outer_tx, outer) = test_channel::<usize>();
    let (a_tx, a) = test_channel::<i32>();
    let (b_tx, b) = test_channel::<i32>();
    let mut inners = vec![Some(a), Some(b)];
    let switched = outer.switch_map(move |i| inners[i].take().expect("inner used once"));
    let (mut recorder, _sub) = EventRecorder::listen(&switched);

    // Act
    outer_tx.send(0);
    a_tx.send(1);
    recorder.expect_data(1).await;
    outer_tx.send(1);
    settle().await;

    // Assert: the first inner is canceled, only the second flows.
    a_tx.send(2);
    recorder.expect_nothing().await;
    b_tx.send(3);
    recorder.expect_data(3).await;

    Ok(())
}

#[tokio::test]
async fn switch_map_closes_after_outer_and_last_inner_close() -> anyhow::Result<()> {
    // Arrange
    let (outer_tx, outer) = test_channel::<usize>();
    let (a_tx, a) = test_channel::<i32>();
    let mut inner = Some(a);
    let switched = outer.switch_map(move |_| inner.take().expect("single inner"));
    let (mut recorder, _sub) = EventRecorder::listen(&switched);

    // Act
    outer_tx.send(0);
    settle().await;
    outer_tx.close();
    recorder.expect_nothing().await;
    a_tx.send(1);
    recorder.expect_data(1).await;
    a_tx.close();

    // Assert
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn switch_latest_follows_the_newest_stream() -> anyhow::Result<()> {
    // Arrange
    let (outer_tx, outer) = test_channel::<EventStream<i32>>();
    let switched = outer.switch_latest();
    let (mut recorder, _sub) = EventRecorder::listen(&switched);

    let (a_tx, a) = test_channel();
    let (b_tx, b) = test_channel();

    // Act
    outer_tx.send(a);
    a_tx.send(1);
    recorder.expect_data(1).await;
    outer_tx.send(b);
    settle().await;
    a_tx.send(2);
    b_tx.send(3);

    // Assert
    recorder.expect_data(3).await;
    recorder.expect_nothing().await;

    Ok(())
}

#[tokio::test]
async fn concurrent_expand_interleaves_all_inners() -> anyhow::Result<()> {
    // Arrange
    let (outer_tx, outer) = test_channel::<usize>();
    let (a_tx, a) = test_channel::<i32>();
    let (b_tx, b) = test_channel::<i32>();
    let mut inners = vec![Some(a), Some(b)];
    let expanded = outer.concurrent_async_expand(move |i| inners[i].take().expect("once"));
    let (mut recorder, _sub) = EventRecorder::listen(&expanded);

    // Act: both inners live at once.
    outer_tx.send(0);
    outer_tx.send(1);
    settle().await;
    a_tx.send(1);
    recorder.expect_data(1).await;
    b_tx.send(2);
    recorder.expect_data(2).await;
    a_tx.send(3);
    recorder.expect_data(3).await;

    // Assert: closes only after outer and every inner are done.
    outer_tx.close();
    a_tx.close();
    recorder.expect_nothing().await;
    b_tx.close();
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn sequential_expand_queues_later_inners() -> anyhow::Result<()> {
    // Arrange
    let (outer_tx, outer) = test_channel::<usize>();
    let (a_tx, a) = test_channel::<i32>();
    let (b_tx, b) = test_channel::<i32>();
    // Pre-fill the second inner; its events must wait for the first.
    b_tx.send(10);
    let mut inners = vec![Some(a), Some(b)];
    let expanded = outer.sequential_async_expand(move |i| inners[i].take().expect("once"));
    let (mut recorder, _sub) = EventRecorder::listen(&expanded);

    // Act
    outer_tx.send(0);
    outer_tx.send(1);
    settle().await;
    a_tx.send(1);
    recorder.expect_data(1).await;

    // Assert: the queued inner's buffered event only flows once the first
    // inner closes.
    recorder.expect_nothing().await;
    a_tx.close();
    recorder.expect_data(10).await;

    outer_tx.close();
    b_tx.close();
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn sequential_expand_preserves_outer_order() -> anyhow::Result<()> {
    // Arrange
    let (outer_tx, outer) = test_channel();
    let expanded = outer.sequential_async_expand(|values: Vec<i32>| EventStream::from_iter(values));
    let (mut recorder, _sub) = EventRecorder::listen(&expanded);

    // Act: two outer events in the same turn; inners are queued, not raced.
    outer_tx.send(vec![1, 2]);
    outer_tx.send(vec![3, 4]);
    outer_tx.close();

    // Assert
    assert_eq!(recorder.drain_data().await, vec![1, 2, 3, 4]);
    recorder.expect_done().await;

    Ok(())
}
