//! Streaming object reader / 对象流式读取
//!
//! The first read triggers a single fetch of the whole stored unit; the
//! payload is staged in memory and later reads drain it. A reader opened
//! before a rewrite keeps returning the payload it fetched.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};

use super::store::{ConfigStore, StoreError};

/// Replayed on every read after a failed fetch. Names the object by its
/// logical key, never by the internal storage name.
#[derive(Debug, Clone, Error)]
#[error("failed to read object {key}")]
struct ReadError {
    key: String,
    #[source]
    source: StoreError,
}

fn read_error(key: &str, source: &StoreError) -> io::Error {
    io::Error::new(
        source.io_kind(),
        ReadError {
            key: key.to_string(),
            source: source.clone(),
        },
    )
}

enum ReaderState {
    /// Nothing fetched yet.
    Idle,
    /// Fetch in flight; dropping the reader aborts it.
    Fetching(BoxFuture<'static, Result<Bytes, StoreError>>),
    /// Staged payload being drained, empty means end of stream.
    Draining(Bytes),
    /// Fetch failed, error replays on every later read.
    Failed(StoreError),
}

/// Reader over one stored object / 单个存储对象的读取器
///
/// Close is just drop and never fails. 关闭即丢弃，不会报错。
pub struct ConfigMapReader {
    store: Arc<dyn ConfigStore>,
    namespace: String,
    name: String,
    /// Logical key, only used in error messages.
    key: String,
    state: ReaderState,
}

impl ConfigMapReader {
    pub fn new(store: Arc<dyn ConfigStore>, namespace: &str, name: &str, key: &str) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
            state: ReaderState::Idle,
        }
    }
}

impl AsyncRead for ConfigMapReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                ReaderState::Idle => {
                    let store = Arc::clone(&this.store);
                    let namespace = this.namespace.clone();
                    let name = this.name.clone();
                    this.state = ReaderState::Fetching(
                        async move {
                            let unit = store.get(&namespace, &name).await?;
                            Ok(Bytes::from(unit.into_payload()))
                        }
                        .boxed(),
                    );
                }
                ReaderState::Fetching(fetch) => match fetch.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(payload)) => {
                        tracing::debug!("对象读取完成: key={}, size={}", this.key, payload.len());
                        this.state = ReaderState::Draining(payload);
                    }
                    Poll::Ready(Err(err)) => {
                        let io_err = read_error(&this.key, &err);
                        this.state = ReaderState::Failed(err);
                        return Poll::Ready(Err(io_err));
                    }
                },
                ReaderState::Draining(payload) => {
                    if payload.is_empty() || buf.remaining() == 0 {
                        return Poll::Ready(Ok(()));
                    }
                    let n = payload.len().min(buf.remaining());
                    buf.put_slice(&payload.split_to(n));
                    return Poll::Ready(Ok(()));
                }
                ReaderState::Failed(err) => {
                    return Poll::Ready(Err(read_error(&this.key, err)));
                }
            }
        }
    }
}
