// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rivulet_error::StreamError;

/// A single event on a stream.
///
/// A stream is an ordered sequence of [`Data`](Event::Data) and
/// [`Error`](Event::Error) events terminated by at most one
/// [`Done`](Event::Done). Errors are ordinary events: they do not terminate
/// the stream.
#[derive(Debug, Clone)]
pub enum Event<T> {
    /// A data value
    Data(T),
    /// A non-terminal error
    Error(StreamError),
    /// End of the stream; nothing follows
    Done,
}

impl<T> Event<T> {
    /// Returns `true` if this is a `Data` event.
    pub const fn is_data(&self) -> bool {
        matches!(self, Event::Data(_))
    }

    /// Returns `true` if this is an `Error` event.
    pub const fn is_error(&self) -> bool {
        matches!(self, Event::Error(_))
    }

    /// Returns `true` if this is the terminal `Done` event.
    pub const fn is_done(&self) -> bool {
        matches!(self, Event::Done)
    }

    /// Converts to `Option<T>`, discarding errors and done.
    pub fn data(self) -> Option<T> {
        match self {
            Event::Data(v) => Some(v),
            _ => None,
        }
    }

    /// Maps the data value, leaving errors and done untouched.
    pub fn map<U, F>(self, f: F) -> Event<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Event::Data(v) => Event::Data(f(v)),
            Event::Error(e) => Event::Error(e),
            Event::Done => Event::Done,
        }
    }
}

impl<T: PartialEq> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Event::Data(a), Event::Data(b)) => a == b,
            (Event::Done, Event::Done) => true,
            // Errors are never equal
            _ => false,
        }
    }
}

/// The three listener callbacks handed to [`listen`](crate::EventStream::listen).
///
/// All handlers default to no-ops; set only the ones you care about:
///
/// ```
/// use rivulet_core::EventHandlers;
///
/// let handlers = EventHandlers::<i32>::new()
///     .on_data(|v| println!("got {v}"))
///     .on_done(|| println!("done"));
/// ```
pub struct EventHandlers<T> {
    pub(crate) on_data: Box<dyn FnMut(T) + Send>,
    pub(crate) on_error: Box<dyn FnMut(StreamError) + Send>,
    pub(crate) on_done: Box<dyn FnMut() + Send>,
}

impl<T> EventHandlers<T> {
    /// Create a handler set where every callback is a no-op.
    #[must_use]
    pub fn new() -> Self {
        Self {
            on_data: Box::new(|_| {}),
            on_error: Box::new(|_| {}),
            on_done: Box::new(|| {}),
        }
    }

    /// Set the data callback.
    #[must_use]
    pub fn on_data(mut self, f: impl FnMut(T) + Send + 'static) -> Self {
        self.on_data = Box::new(f);
        self
    }

    /// Set the error callback.
    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(StreamError) + Send + 'static) -> Self {
        self.on_error = Box::new(f);
        self
    }

    /// Set the done callback.
    #[must_use]
    pub fn on_done(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_done = Box::new(f);
        self
    }

    /// Dispatch one event to the matching handler.
    pub(crate) fn handle(&mut self, event: Event<T>) {
        match event {
            Event::Data(v) => (self.on_data)(v),
            Event::Error(e) => (self.on_error)(e),
            Event::Done => (self.on_done)(),
        }
    }
}

impl<T> Default for EventHandlers<T> {
    fn default() -> Self {
        Self::new()
    }
}
