// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_core::{CancellationToken, EventStream};
use rivulet_stream::prelude::*;
use rivulet_test_utils::{test_channel, EventRecorder};

#[tokio::test]
async fn followed_by_concatenates_in_order() -> anyhow::Result<()> {
    // Arrange
    let concatenated =
        EventStream::from_iter([1, 2]).followed_by(EventStream::from_iter([3, 4]));
    let (mut recorder, _sub) = EventRecorder::listen(&concatenated);

    // Assert
    assert_eq!(recorder.drain_data().await, vec![1, 2, 3, 4]);
    recorder.expect_done().await;
    Ok(())
}

#[tokio::test]
async fn followed_by_empty_is_identity_either_way() -> anyhow::Result<()> {
    // Arrange
    let suffixed = EventStream::from_iter([1, 2]).followed_by(EventStream::empty());
    let prefixed = EventStream::<i32>::empty().followed_by(EventStream::from_iter([1, 2]));
    let (mut suffix_recorder, _sub_a) = EventRecorder::listen(&suffixed);
    let (mut prefix_recorder, _sub_b) = EventRecorder::listen(&prefixed);

    // Assert
    assert_eq!(suffix_recorder.drain_data().await, vec![1, 2]);
    assert_eq!(prefix_recorder.drain_data().await, vec![1, 2]);
    Ok(())
}

#[tokio::test]
async fn followed_by_subscribes_next_only_after_first_closes() -> anyhow::Result<()> {
    // Arrange
    let (first_tx, first) = test_channel();
    let (second_tx, second) = test_channel();
    let concatenated = first.followed_by(second);
    let (mut recorder, _sub) = EventRecorder::listen(&concatenated);

    // Act: events on the second stream before the first closes are lost to
    // the concatenation, since it is not yet subscribed.
    second_tx.send(99);
    first_tx.send(1);
    recorder.expect_data(1).await;
    first_tx.close();
    second_tx.send(2);

    // Assert
    recorder.expect_data(2).await;
    recorder.expect_nothing().await;

    Ok(())
}

#[tokio::test]
async fn start_with_prefixes_a_value() -> anyhow::Result<()> {
    // Arrange
    let prefixed = EventStream::from_iter([2, 3]).start_with(1);
    let (mut recorder, _sub) = EventRecorder::listen(&prefixed);

    // Assert: skipping the prefix recovers the source sequence.
    assert_eq!(recorder.drain_data().await, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn start_with_many_prefixes_in_order() -> anyhow::Result<()> {
    // Arrange
    let prefixed = EventStream::from_iter([3]).start_with_many(vec![1, 2]);
    let (mut recorder, _sub) = EventRecorder::listen(&prefixed);

    // Assert
    assert_eq!(recorder.drain_data().await, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn start_with_stream_plays_the_whole_prefix_first() -> anyhow::Result<()> {
    // Arrange
    let prefixed =
        EventStream::from_iter([3, 4]).start_with_stream(EventStream::from_iter([1, 2]));
    let (mut recorder, _sub) = EventRecorder::listen(&prefixed);

    // Assert
    assert_eq!(recorder.drain_data().await, vec![1, 2, 3, 4]);
    Ok(())
}

#[tokio::test]
async fn take_until_closes_on_trigger_and_cancels_the_source() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = test_channel();
    let stop = CancellationToken::new();
    let stopper = stop.clone();
    let taken = stream.take_until(async move { stopper.cancelled().await });
    let (mut recorder, _sub) = EventRecorder::listen(&taken);

    // Act
    tx.send(1);
    recorder.expect_data(1).await;
    stop.cancel();
    recorder.expect_done().await;

    // Assert: later source events no longer reach the output.
    tx.send(2);
    recorder.expect_nothing().await;

    Ok(())
}

#[tokio::test]
async fn take_until_delivers_events_already_in_the_pipeline() -> anyhow::Result<()> {
    // Arrange
    let (tx, stream) = test_channel();
    let stop = CancellationToken::new();
    let stopper = stop.clone();
    let taken = stream.take_until(async move { stopper.cancelled().await });
    let (mut recorder, sub) = EventRecorder::listen(&taken);

    // Act: the value is accepted before the trigger fires in the same
    // scheduler turn.
    tx.send(1);
    stop.cancel();

    // Assert: the accepted event precedes the close.
    recorder.expect_data(1).await;
    recorder.expect_done().await;
    drop(sub);

    Ok(())
}
