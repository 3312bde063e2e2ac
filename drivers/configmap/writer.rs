//! Streaming object writer / 对象流式写入
//!
//! Bytes only accumulate in memory; nothing reaches the store before
//! shutdown. The commit probes for an existing storage name and either
//! creates the stored unit or replaces it wholesale. Probe and commit are
//! deliberately unguarded, concurrent writers on one key race exactly as
//! the store lets them.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::BytesMut;
use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tokio::io::AsyncWrite;

use super::store::{ConfigStore, StoreError};
use super::types::ConfigMap;

/// Commit branch picked by the existence probe.
/// 存在性探测选出的提交分支
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    Create,
    Replace,
}

/// Commit failure with the failing phase spelled out in the message.
#[derive(Debug, Clone, Error)]
#[error("{context}")]
struct CommitError {
    context: String,
    #[source]
    source: StoreError,
}

fn commit_io_error(err: &CommitError) -> io::Error {
    io::Error::new(err.source.io_kind(), err.clone())
}

fn commit_future(
    store: Arc<dyn ConfigStore>,
    namespace: String,
    name: String,
    key: String,
    payload: Vec<u8>,
) -> BoxFuture<'static, Result<CommitMode, CommitError>> {
    async move {
        let unit = ConfigMap::stored_unit(&namespace, &name, &key, payload);
        let mode = match store.get(&namespace, &name).await {
            Ok(_) => CommitMode::Replace,
            Err(StoreError::NotFound(_)) => CommitMode::Create,
            // any other probe outcome aborts before create or update
            Err(err) => {
                return Err(CommitError {
                    context: format!("failed to check for an existing object {}", key),
                    source: StoreError::Precondition(err.to_string()),
                });
            }
        };
        match mode {
            CommitMode::Create => {
                store
                    .create(&namespace, &unit)
                    .await
                    .map_err(|source| CommitError {
                        context: format!("failed to create object {}", key),
                        source,
                    })?
            }
            CommitMode::Replace => {
                store
                    .update(&namespace, &unit)
                    .await
                    .map_err(|source| CommitError {
                        context: format!("failed to replace object {}", key),
                        source,
                    })?
            }
        }
        Ok(mode)
    }
    .boxed()
}

enum WriterState {
    /// Accepting bytes into the buffer.
    Buffering,
    /// Commit in flight, started by the first shutdown poll.
    Committing(BoxFuture<'static, Result<CommitMode, CommitError>>),
    /// Commit succeeded, later shutdowns are no-ops.
    Done,
    /// Commit failed, error replays on later shutdown polls.
    Failed(CommitError),
}

/// Writer for one object / 单个对象的写入器
///
/// Dropping an unshut writer discards the buffer without touching the
/// store. 未 shutdown 就丢弃时不会写入任何数据。
pub struct ConfigMapWriter {
    store: Arc<dyn ConfigStore>,
    namespace: String,
    name: String,
    /// Logical key, recorded in the stored unit and used in errors.
    key: String,
    buffer: BytesMut,
    state: WriterState,
}

impl ConfigMapWriter {
    pub fn new(store: Arc<dyn ConfigStore>, namespace: &str, name: &str, key: &str) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
            buffer: BytesMut::new(),
            state: WriterState::Buffering,
        }
    }
}

impl AsyncWrite for ConfigMapWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match this.state {
            WriterState::Buffering => {
                this.buffer.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }
            _ => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "写入器已关闭 / writer already shut down",
            ))),
        }
    }

    // nothing to flush, data moves only on shutdown
    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                WriterState::Buffering => {
                    let store = Arc::clone(&this.store);
                    let namespace = this.namespace.clone();
                    let name = this.name.clone();
                    let key = this.key.clone();
                    let payload = this.buffer.split().to_vec();
                    tracing::debug!("提交对象: key={}, size={}", key, payload.len());
                    this.state = WriterState::Committing(commit_future(
                        store, namespace, name, key, payload,
                    ));
                }
                WriterState::Committing(commit) => match commit.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(mode)) => {
                        match mode {
                            CommitMode::Create => {
                                tracing::debug!("对象已创建: key={}", this.key)
                            }
                            CommitMode::Replace => {
                                tracing::debug!("对象已替换: key={}", this.key)
                            }
                        }
                        this.state = WriterState::Done;
                        return Poll::Ready(Ok(()));
                    }
                    Poll::Ready(Err(err)) => {
                        let io_err = commit_io_error(&err);
                        this.state = WriterState::Failed(err);
                        return Poll::Ready(Err(io_err));
                    }
                },
                WriterState::Done => return Poll::Ready(Ok(())),
                WriterState::Failed(err) => return Poll::Ready(Err(commit_io_error(err))),
            }
        }
    }
}
