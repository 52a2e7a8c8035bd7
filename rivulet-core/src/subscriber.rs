// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Per-listener delivery machinery shared by both controller kinds.
//!
//! Each active subscription owns one [`Subscriber`]: an event queue drained
//! by a dedicated pump task. The pump suspends while the subscription is
//! paused and exits on cancel or after delivering `Done`. Handlers always run
//! on the pump task with no lock held, so a handler may freely pause, resume
//! or cancel its own subscription.

use crate::event::{Event, EventHandlers};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

pub(crate) struct Subscriber<T> {
    state: Mutex<SubscriberState<T>>,
    notify: Notify,
}

struct SubscriberState<T> {
    queue: VecDeque<Event<T>>,
    pause_depth: usize,
    canceled: bool,
}

impl<T: Send + 'static> Subscriber<T> {
    pub(crate) fn new(initial: VecDeque<Event<T>>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SubscriberState {
                queue: initial,
                pause_depth: 0,
                canceled: false,
            }),
            notify: Notify::new(),
        })
    }

    /// Enqueue an event for delivery. Dropped if the subscription is canceled.
    pub(crate) fn push(&self, event: Event<T>) {
        {
            let mut state = self.state.lock();
            if state.canceled {
                return;
            }
            state.queue.push_back(event);
        }
        self.notify.notify_one();
    }

    /// Increase the pause depth; delivery stops until matched by `resume`.
    pub(crate) fn pause(&self) {
        self.state.lock().pause_depth += 1;
    }

    pub(crate) fn resume(&self) {
        let resumed = {
            let mut state = self.state.lock();
            if state.pause_depth > 0 {
                state.pause_depth -= 1;
            }
            state.pause_depth == 0
        };
        if resumed {
            self.notify.notify_one();
        }
    }

    /// Stop delivery permanently and drop any buffered events.
    pub(crate) fn cancel(&self) {
        {
            let mut state = self.state.lock();
            state.canceled = true;
            state.queue.clear();
        }
        self.notify.notify_one();
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.state.lock().canceled
    }

    /// Spawn the pump task delivering queued events into `handlers`.
    ///
    /// The task exits when the subscription is canceled or `Done` has been
    /// delivered, releasing the handlers either way.
    pub(crate) fn spawn_pump(subscriber: &Arc<Self>, mut handlers: EventHandlers<T>) {
        let subscriber = Arc::clone(subscriber);
        tokio::spawn(async move {
            loop {
                let event = loop {
                    // Register interest before checking state; a push between
                    // the check and the await is then never lost.
                    let notified = subscriber.notify.notified();
                    {
                        let mut state = subscriber.state.lock();
                        if state.canceled {
                            return;
                        }
                        if state.pause_depth == 0 {
                            if let Some(event) = state.queue.pop_front() {
                                break event;
                            }
                        }
                    }
                    notified.await;
                };

                let was_done = event.is_done();
                handlers.handle(event);
                if was_done {
                    return;
                }
            }
        });
    }
}
