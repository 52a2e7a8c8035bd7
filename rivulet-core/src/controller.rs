// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Single-subscription stream controller.
//!
//! A [`StreamController`] is the write end of a single-subscription
//! [`EventStream`](crate::EventStream). Events added before the stream is
//! listened to are buffered; once a listener attaches, a pump task drains
//! them in order. Pausing the subscription stops the pump and buffers
//! further events; lifecycle hooks let an operator react to listen, pause,
//! resume and cancel.

use crate::event::{Event, EventHandlers};
use crate::subscriber::Subscriber;
use crate::subscription::{resolved_cancel, CancelFuture, Subscription};
use parking_lot::Mutex;
use rivulet_error::{Result, StreamError};
use std::collections::VecDeque;
use std::sync::Arc;

type PauseHook = Arc<dyn Fn() + Send + Sync>;

pub(crate) struct SingleShared<T> {
    state: Mutex<SingleState<T>>,
}

struct SingleState<T> {
    prelisten: VecDeque<Event<T>>,
    subscriber: Option<Arc<Subscriber<T>>>,
    listened: bool,
    closed: bool,
    on_listen: Option<Box<dyn FnOnce() + Send>>,
    on_pause: Option<PauseHook>,
    on_resume: Option<PauseHook>,
    on_cancel: Option<Box<dyn FnOnce() -> CancelFuture + Send>>,
}

impl<T: Send + 'static> SingleShared<T> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SingleState {
                prelisten: VecDeque::new(),
                subscriber: None,
                listened: false,
                closed: false,
                on_listen: None,
                on_pause: None,
                on_resume: None,
                on_cancel: None,
            }),
        })
    }

    /// Route an event to the listener, or buffer it while unlistened.
    ///
    /// Events after `Done` are silently dropped.
    pub(crate) fn dispatch(&self, event: Event<T>) {
        let subscriber = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            if event.is_done() {
                state.closed = true;
            }
            match state.subscriber.as_ref() {
                Some(subscriber) => Arc::clone(subscriber),
                None => {
                    state.prelisten.push_back(event);
                    return;
                }
            }
        };
        subscriber.push(event);
    }

    /// Like [`dispatch`](Self::dispatch), but reports why a push went
    /// nowhere instead of dropping it silently.
    pub(crate) fn try_dispatch(&self, event: Event<T>) -> Result<()> {
        let subscriber = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(StreamError::Closed);
            }
            match state.subscriber.as_ref() {
                Some(subscriber) if subscriber.is_canceled() => {
                    return Err(StreamError::ChannelSend);
                }
                Some(subscriber) => Arc::clone(subscriber),
                None => {
                    state.prelisten.push_back(event);
                    return Ok(());
                }
            }
        };
        subscriber.push(event);
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub(crate) fn try_listen(&self, handlers: EventHandlers<T>) -> Result<Subscription> {
        let (subscriber, on_listen, on_pause, on_resume, on_cancel) = {
            let mut state = self.state.lock();
            if state.listened {
                return Err(StreamError::AlreadyListened);
            }
            state.listened = true;
            let subscriber = Subscriber::new(std::mem::take(&mut state.prelisten));
            state.subscriber = Some(Arc::clone(&subscriber));
            (
                subscriber,
                state.on_listen.take(),
                state.on_pause.clone(),
                state.on_resume.clone(),
                state.on_cancel.take(),
            )
        };

        crate::trace!("single-subscription stream listened");
        Subscriber::spawn_pump(&subscriber, handlers);
        if let Some(hook) = on_listen {
            hook();
        }

        let pause_target = Arc::clone(&subscriber);
        let resume_target = Arc::clone(&subscriber);
        Ok(Subscription::new(
            move || {
                pause_target.pause();
                if let Some(hook) = &on_pause {
                    hook();
                }
            },
            move || {
                resume_target.resume();
                if let Some(hook) = &on_resume {
                    hook();
                }
            },
            move || {
                crate::trace!("single-subscription canceled");
                subscriber.cancel();
                match on_cancel {
                    Some(hook) => hook(),
                    None => resolved_cancel(),
                }
            },
        ))
    }
}

/// The write end of a single-subscription stream.
///
/// Mirrors the push side of a subject: `add`/`add_error` feed events in,
/// `close` terminates the stream. [`stream`](StreamController::stream) hands
/// out the read end (exactly one listener for the stream's lifetime).
///
/// # Example
///
/// ```
/// use rivulet_core::{EventHandlers, StreamController};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let controller = StreamController::new();
/// controller.add(1);
/// controller.add(2);
/// controller.close();
///
/// let stream = controller.stream();
/// stream.listen(EventHandlers::new().on_data(|v: i32| println!("{v}")));
/// # }
/// ```
pub struct StreamController<T> {
    shared: Arc<SingleShared<T>>,
}

impl<T: Clone + Send + 'static> StreamController<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: SingleShared::new(),
        }
    }

    /// Push a data event.
    pub fn add(&self, value: T) {
        self.shared.dispatch(Event::Data(value));
    }

    /// Push a data event, reporting failure instead of dropping it.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Closed`] after `close`, and
    /// [`StreamError::ChannelSend`] once the stream's only subscription has
    /// been canceled.
    pub fn try_add(&self, value: T) -> Result<()> {
        self.shared.try_dispatch(Event::Data(value))
    }

    /// Push an error event. Errors do not terminate the stream.
    pub fn add_error(&self, error: StreamError) {
        self.shared.dispatch(Event::Error(error));
    }

    /// Terminate the stream. Later writes are dropped.
    pub fn close(&self) {
        self.shared.dispatch(Event::Done);
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// A cloneable write handle to this controller.
    #[must_use]
    pub fn sink(&self) -> crate::sink::EventSink<T> {
        crate::sink::EventSink::single(Arc::clone(&self.shared))
    }

    /// The read end. Accepts exactly one listener.
    #[must_use]
    pub fn stream(&self) -> crate::stream::EventStream<T> {
        crate::stream::EventStream::from_single(Arc::clone(&self.shared))
    }

    /// Hook invoked when the stream is listened to.
    ///
    /// Hooks must be installed before the stream is handed out.
    pub fn set_on_listen(&self, hook: impl FnOnce() + Send + 'static) {
        self.shared.state.lock().on_listen = Some(Box::new(hook));
    }

    /// Hook invoked on every pause of the subscription.
    pub fn set_on_pause(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.shared.state.lock().on_pause = Some(Arc::new(hook));
    }

    /// Hook invoked on every resume of the subscription.
    pub fn set_on_resume(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.shared.state.lock().on_resume = Some(Arc::new(hook));
    }

    /// Hook invoked when the subscription is canceled; its future becomes
    /// the subscription's cancel completion.
    pub fn set_on_cancel(&self, hook: impl FnOnce() -> CancelFuture + Send + 'static) {
        self.shared.state.lock().on_cancel = Some(Box::new(hook));
    }
}

impl<T: Clone + Send + 'static> Default for StreamController<T> {
    fn default() -> Self {
        Self::new()
    }
}
