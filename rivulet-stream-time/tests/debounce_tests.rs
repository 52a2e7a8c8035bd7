// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_stream_time::prelude::*;
use rivulet_test_utils::{test_channel, EventRecorder};
use std::time::Duration;
use tokio::time::{advance, pause};

#[tokio::test]
async fn debounce_emits_last_value_after_quiet_period() -> anyhow::Result<()> {
    // Arrange
    pause();
    let (tx, stream) = test_channel();
    let debounced = stream.debounce(Duration::from_millis(5));
    let (mut recorder, _sub) = EventRecorder::listen(&debounced);

    // Act
    tx.send(1);
    tx.send(2);
    tx.send(3);
    tx.close();
    recorder.expect_nothing().await;

    // Assert
    advance(Duration::from_millis(5)).await;
    recorder.expect_data(3).await;
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn debounce_restarts_the_timer_on_each_event() -> anyhow::Result<()> {
    // Arrange
    pause();
    let (tx, stream) = test_channel();
    let debounced = stream.debounce(Duration::from_millis(5));
    let (mut recorder, _sub) = EventRecorder::listen(&debounced);

    // Act
    tx.send(1);
    recorder.expect_nothing().await;
    advance(Duration::from_millis(3)).await;
    tx.send(2);
    recorder.expect_nothing().await;

    // Assert: 3ms after the first event nothing fires; the burst ends 5ms
    // after the second.
    advance(Duration::from_millis(4)).await;
    recorder.expect_nothing().await;
    advance(Duration::from_millis(1)).await;
    recorder.expect_data(2).await;

    Ok(())
}

#[tokio::test]
async fn debounce_leading_emits_first_value_of_burst() -> anyhow::Result<()> {
    // Arrange
    pause();
    let (tx, stream) = test_channel();
    let debounced = stream.debounce_edges(Duration::from_millis(5), true, true);
    let (mut recorder, _sub) = EventRecorder::listen(&debounced);

    // Act & Assert: burst of two, leading out immediately, trailing at end.
    tx.send(1);
    recorder.expect_data(1).await;
    tx.send(2);
    recorder.expect_nothing().await;
    advance(Duration::from_millis(5)).await;
    recorder.expect_data(2).await;

    Ok(())
}

#[tokio::test]
async fn debounce_leading_suppresses_trailing_for_single_event_burst() -> anyhow::Result<()> {
    // Arrange
    pause();
    let (tx, stream) = test_channel();
    let debounced = stream.debounce_edges(Duration::from_millis(5), true, true);
    let (mut recorder, _sub) = EventRecorder::listen(&debounced);

    // Act
    tx.send(1);
    recorder.expect_data(1).await;

    // Assert: the value already went out as leading; the timer emits nothing.
    advance(Duration::from_millis(5)).await;
    recorder.expect_nothing().await;

    // The next burst emits as leading again.
    tx.send(2);
    recorder.expect_data(2).await;

    Ok(())
}

#[tokio::test]
async fn debounce_closing_mid_burst_defers_done_past_the_emit() -> anyhow::Result<()> {
    // Arrange
    pause();
    let (tx, stream) = test_channel();
    let debounced = stream.debounce(Duration::from_millis(5));
    let (mut recorder, _sub) = EventRecorder::listen(&debounced);

    // Act
    tx.send(9);
    recorder.expect_nothing().await;
    tx.close();
    recorder.expect_nothing().await;

    // Assert
    advance(Duration::from_millis(5)).await;
    recorder.expect_data(9).await;
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn debounce_buffer_collects_the_whole_burst() -> anyhow::Result<()> {
    // Arrange
    pause();
    let (tx, stream) = test_channel();
    let buffered = stream.debounce_buffer(Duration::from_millis(5));
    let (mut recorder, _sub) = EventRecorder::listen(&buffered);

    // Act
    tx.send(1);
    tx.send(2);
    recorder.expect_nothing().await;
    advance(Duration::from_millis(5)).await;
    recorder.expect_data(vec![1, 2]).await;

    // A later burst starts a fresh list.
    tx.send(3);
    recorder.expect_nothing().await;
    advance(Duration::from_millis(5)).await;
    recorder.expect_data(vec![3]).await;

    Ok(())
}

#[tokio::test]
async fn canceling_the_output_cancels_the_burst_timer() -> anyhow::Result<()> {
    // Arrange
    pause();
    let (tx, stream) = test_channel();
    let debounced = stream.debounce(Duration::from_millis(5));
    let (mut recorder, sub) = EventRecorder::listen(&debounced);

    // Act
    tx.send(1);
    recorder.expect_nothing().await;
    sub.cancel().await?;

    // Assert
    advance(Duration::from_millis(10)).await;
    recorder.expect_nothing().await;

    Ok(())
}
