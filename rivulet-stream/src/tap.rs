// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::transform::{transform_events, TransformHandlers};
use rivulet_core::{EventStream, StreamError};

/// Extension trait providing the [`tap`](TapExt::tap) operator.
pub trait TapExt<T>
where
    T: Clone + Send + 'static,
{
    /// Invokes side-effect callbacks before forwarding each event.
    ///
    /// The event sequence is unchanged. On a broadcast output each callback
    /// runs once per event, not once per listener.
    fn tap<FD, FE, FC>(self, on_data: FD, on_error: FE, on_done: FC) -> EventStream<T>
    where
        FD: FnMut(&T) + Send + 'static,
        FE: FnMut(&StreamError) + Send + 'static,
        FC: FnMut() + Send + 'static;

    /// [`tap`](TapExt::tap) observing data events only.
    fn tap_data<FD>(self, on_data: FD) -> EventStream<T>
    where
        FD: FnMut(&T) + Send + 'static;
}

impl<T> TapExt<T> for EventStream<T>
where
    T: Clone + Send + 'static,
{
    fn tap<FD, FE, FC>(self, mut on_data: FD, mut on_error: FE, mut on_done: FC) -> EventStream<T>
    where
        FD: FnMut(&T) + Send + 'static,
        FE: FnMut(&StreamError) + Send + 'static,
        FC: FnMut() + Send + 'static,
    {
        transform_events(
            self,
            TransformHandlers::new(move |v: T, sink| {
                on_data(&v);
                sink.add(v);
            })
            .on_error(move |e, sink| {
                on_error(&e);
                sink.add_error(e);
            })
            .on_done(move |sink| {
                on_done();
                sink.close();
            }),
        )
    }

    fn tap_data<FD>(self, on_data: FD) -> EventStream<T>
    where
        FD: FnMut(&T) + Send + 'static,
    {
        self.tap(on_data, |_| {}, || {})
    }
}
