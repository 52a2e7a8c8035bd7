// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_stream_time::prelude::*;
use rivulet_test_utils::{test_channel, EventRecorder};
use std::time::Duration;
use tokio::time::{advance, pause};

#[tokio::test]
async fn audit_emits_latest_value_at_period_end() -> anyhow::Result<()> {
    // Arrange
    pause();
    let (tx, stream) = test_channel();
    let audited = stream.audit(Duration::from_millis(5));
    let (mut recorder, _sub) = EventRecorder::listen(&audited);

    // Act: 1 at t=0, 2 at t=3ms, 3 at t=6ms.
    tx.send(1);
    recorder.expect_nothing().await;
    advance(Duration::from_millis(3)).await;
    tx.send(2);
    recorder.expect_nothing().await;

    // Assert: the period opened at t=0 ends at t=5ms with the latest value.
    advance(Duration::from_millis(2)).await;
    recorder.expect_data(2).await;

    // The event at t=6ms opens the next period, ending at t=11ms.
    advance(Duration::from_millis(1)).await;
    tx.send(3);
    recorder.expect_nothing().await;
    advance(Duration::from_millis(5)).await;
    recorder.expect_data(3).await;

    Ok(())
}

#[tokio::test]
async fn audit_defers_done_until_the_timer_fires() -> anyhow::Result<()> {
    // Arrange
    pause();
    let (tx, stream) = test_channel();
    let audited = stream.audit(Duration::from_millis(5));
    let (mut recorder, _sub) = EventRecorder::listen(&audited);

    // Act
    tx.send(7);
    recorder.expect_nothing().await;
    tx.close();
    recorder.expect_nothing().await;

    // Assert
    advance(Duration::from_millis(5)).await;
    recorder.expect_data(7).await;
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn audit_closes_immediately_when_idle() -> anyhow::Result<()> {
    // Arrange
    pause();
    let (tx, stream) = test_channel();
    let audited = stream.audit(Duration::from_millis(5));
    let (mut recorder, _sub) = EventRecorder::listen(&audited);

    // Act
    tx.send(1);
    recorder.expect_nothing().await;
    advance(Duration::from_millis(5)).await;
    recorder.expect_data(1).await;
    tx.close();

    // Assert: no timer running, done is immediate.
    recorder.expect_done().await;

    Ok(())
}

#[tokio::test]
async fn audit_forwards_errors_unthrottled() -> anyhow::Result<()> {
    // Arrange
    pause();
    let (tx, stream) = test_channel::<i32>();
    let audited = stream.audit(Duration::from_millis(5));
    let (mut recorder, _sub) = EventRecorder::listen(&audited);

    // Act
    tx.send(1);
    tx.send_error(rivulet_core::StreamError::processing("boom"));

    // Assert: the error does not wait for the period.
    recorder.expect_error().await;
    advance(Duration::from_millis(5)).await;
    recorder.expect_data(1).await;

    Ok(())
}
