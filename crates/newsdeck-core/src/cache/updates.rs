use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use dashmap::DashMap;
use futures_core::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{trace, warn};

/// One broadcast sender per (scope, key) with at least one subscriber.
pub(crate) type UpdateChannels = DashMap<(String, String), broadcast::Sender<Value>>;

/// Values published by `SwrCache::set` for one (scope, key).
///
/// Only emits for sets that happen after subscription. A slow consumer that
/// falls behind skips the missed values; values that do not decode as `T`
/// are skipped too.
///
/// Dropping the last stream for a key removes that key's channel.
pub struct UpdateStream<T> {
    inner: BroadcastStream<Value>,
    channels: Arc<UpdateChannels>,
    scope: String,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> UpdateStream<T> {
    pub(crate) fn new(
        rx: broadcast::Receiver<Value>,
        channels: Arc<UpdateChannels>,
        scope: &str,
        key: &str,
    ) -> Self {
        Self {
            inner: BroadcastStream::new(rx),
            channels,
            scope: scope.to_owned(),
            key: key.to_owned(),
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for UpdateStream<T> {
    fn drop(&mut self) {
        // `inner` is dropped after this runs, so our own receiver still counts.
        let k = (std::mem::take(&mut self.scope), std::mem::take(&mut self.key));
        if self
            .channels
            .remove_if(&k, |_, tx| tx.receiver_count() <= 1)
            .is_some()
        {
            trace!(scope = %k.0, key = %k.1, "released cache update channel");
        }
    }
}

impl<T: DeserializeOwned> Stream for UpdateStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                None => return Poll::Ready(None),
                Some(Ok(value)) => match serde_json::from_value(value) {
                    Ok(decoded) => return Poll::Ready(Some(decoded)),
                    Err(err) => {
                        warn!(scope = %self.scope, key = %self.key, error = %err, "skipping undecodable cache update");
                    }
                },
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(scope = %self.scope, key = %self.key, skipped, "cache update subscriber lagged");
                }
            }
        }
    }
}
