//! ConfigMap blob driver / ConfigMap 对象存储驱动

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::escape::escape_key;
use super::reader::ConfigMapReader;
use super::store::{ConfigStore, StoreError};
use super::writer::ConfigMapWriter;
use crate::storage::{BlobDriver, ErrorKind, ListOptions, ListPage, ObjectAttributes, ObjectEntry};

/// Blob driver persisting each object as one ConfigMap resource inside a
/// fixed namespace. Holds no per-call state beyond the shared store
/// handle, so one instance serves any number of concurrent callers.
/// 将每个对象保存为固定命名空间内一个 ConfigMap 资源的驱动
pub struct ConfigMapDriver {
    store: Arc<dyn ConfigStore>,
    namespace: String,
}

impl ConfigMapDriver {
    pub fn new(store: Arc<dyn ConfigStore>, namespace: &str) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl BlobDriver for ConfigMapDriver {
    fn name(&self) -> &str {
        "configmap"
    }

    async fn list_page(&self, opts: ListOptions) -> Result<ListPage> {
        if opts.page_token.is_some() {
            return Err(StoreError::Unsupported("list continuation tokens").into());
        }
        let units = self
            .store
            .list(&self.namespace)
            .await
            .with_context(|| format!("failed to list objects in namespace {}", self.namespace))?;

        let mut objects = Vec::new();
        for unit in units {
            match unit.original_key() {
                Some(key) => objects.push(ObjectEntry {
                    key: key.to_string(),
                    size: unit.payload().len() as u64,
                    is_dir: false,
                }),
                // config maps other tools created carry no key record
                None => {
                    tracing::debug!("跳过非本驱动创建的 ConfigMap: {}", unit.metadata.name)
                }
            }
        }
        Ok(ListPage {
            objects,
            next_page_token: None,
        })
    }

    async fn new_range_reader(
        &self,
        key: &str,
        offset: u64,
        length: Option<u64>,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        // ranges are accepted but always resolve to a full-object read
        if offset > 0 || length.is_some() {
            tracing::debug!(
                "范围读取参数被忽略: key={}, offset={}, length={:?}",
                key,
                offset,
                length
            );
        }
        let reader = ConfigMapReader::new(
            Arc::clone(&self.store),
            &self.namespace,
            &escape_key(key),
            key,
        );
        Ok(Box::new(reader))
    }

    async fn new_writer(&self, key: &str) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
        let writer = ConfigMapWriter::new(
            Arc::clone(&self.store),
            &self.namespace,
            &escape_key(key),
            key,
        );
        Ok(Box::new(writer))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store
            .delete(&self.namespace, &escape_key(key))
            .await
            .with_context(|| format!("failed to delete object {}", key))?;
        Ok(())
    }

    async fn attributes(&self, _key: &str) -> Result<ObjectAttributes> {
        Err(StoreError::Unsupported("object attributes").into())
    }

    async fn signed_url(&self, _key: &str, _expires_in: Duration) -> Result<String> {
        Err(StoreError::Unsupported("signed object urls").into())
    }

    fn error_code(&self, err: &anyhow::Error) -> ErrorKind {
        for cause in err.chain() {
            if let Some(store_err) = cause.downcast_ref::<StoreError>() {
                return store_err.error_kind();
            }
            // reader/writer failures cross the io boundary with their kind
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
                match io_err.kind() {
                    std::io::ErrorKind::NotFound => return ErrorKind::NotFound,
                    std::io::ErrorKind::TimedOut => return ErrorKind::DeadlineExceeded,
                    std::io::ErrorKind::Unsupported => return ErrorKind::Unimplemented,
                    _ => {}
                }
            }
        }
        ErrorKind::Unknown
    }
}
