//! Cluster config store access / 集群配置存储访问
//!
//! [`ConfigStore`] is the seam between the blob driver and the cluster:
//! five verbs over namespaced ConfigMap resources. [`RestConfigStore`]
//! talks to a real API server; [`MemoryConfigStore`] backs unit tests and
//! cluster-free embedding.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use thiserror::Error;
use tokio::sync::RwLock;

use super::config::ConfigMapConfig;
use super::types::{ConfigMap, ConfigMapList, Status};
use crate::storage::ErrorKind;

/// Failure of a single store call. Cloneable so stream wrappers can
/// replay the same error on every poll.
/// 单次存储调用的失败，可克隆以便流式包装层重复返回
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("config map {0} not found")]
    NotFound(String),
    #[error("cluster api error (http {code}): {message}")]
    Api { code: u16, message: String },
    #[error("store call exceeded its deadline: {0}")]
    Timeout(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed api response: {0}")]
    Decode(String),
    #[error("existence check failed: {0}")]
    Precondition(String),
    #[error("kubernetes config maps do not support {0}")]
    Unsupported(&'static str),
}

impl StoreError {
    /// Translate into the generic driver taxonomy / 转换为通用错误类别
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Timeout(_) => ErrorKind::DeadlineExceeded,
            StoreError::Precondition(_) => ErrorKind::PreconditionFailed,
            StoreError::Unsupported(_) => ErrorKind::Unimplemented,
            StoreError::Api { .. } | StoreError::Transport(_) | StoreError::Decode(_) => {
                ErrorKind::Unknown
            }
        }
    }

    /// Closest `std::io` kind, for errors crossing an AsyncRead/AsyncWrite
    /// boundary.
    pub fn io_kind(&self) -> std::io::ErrorKind {
        match self {
            StoreError::NotFound(_) => std::io::ErrorKind::NotFound,
            StoreError::Timeout(_) => std::io::ErrorKind::TimedOut,
            StoreError::Unsupported(_) => std::io::ErrorKind::Unsupported,
            _ => std::io::ErrorKind::Other,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(err.to_string())
        } else if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Namespaced ConfigMap operations the driver needs.
/// 驱动所需的 ConfigMap 操作集合
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch one resource by name / 按名称获取资源
    async fn get(&self, namespace: &str, name: &str) -> Result<ConfigMap, StoreError>;

    /// Create a resource, failing if the name is taken / 创建资源
    async fn create(&self, namespace: &str, unit: &ConfigMap) -> Result<(), StoreError>;

    /// Replace an existing resource wholesale / 整体替换已有资源
    async fn update(&self, namespace: &str, unit: &ConfigMap) -> Result<(), StoreError>;

    /// Delete by name, missing names are an error / 按名称删除
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    /// All resources in one namespace / 列出命名空间内的所有资源
    async fn list(&self, namespace: &str) -> Result<Vec<ConfigMap>, StoreError>;
}

/// ConfigStore over the cluster REST API / 基于集群 REST API 的实现
///
/// One reqwest client shared by every reader, writer and bucket call; the
/// per-call deadline from [`ConfigMapConfig::timeout_secs`] is baked into
/// the client, so a stalled API server surfaces as [`StoreError::Timeout`]
/// instead of hanging the caller.
pub struct RestConfigStore {
    client: Client,
    base_url: String,
    token: String,
}

impl RestConfigStore {
    pub fn new(config: &ConfigMapConfig) -> Result<Self> {
        if config.api_server.is_empty() {
            return Err(anyhow!("api_server must not be empty"));
        }
        let client = Client::builder()
            .danger_accept_invalid_certs(config.insecure_skip_tls)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("创建HTTP客户端失败")?;
        Ok(Self {
            client,
            base_url: config.api_server.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn collection_url(&self, namespace: &str) -> String {
        format!("{}/api/v1/namespaces/{}/configmaps", self.base_url, namespace)
    }

    fn resource_url(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.collection_url(namespace), name)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, url);
        if !self.token.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.token));
        }
        request
    }

    /// Decode a failed response into a typed error. `name` identifies the
    /// resource for the not-found case.
    async fn response_error(&self, name: &str, response: reqwest::Response) -> StoreError {
        let code = response.status().as_u16();
        if code == 404 {
            return StoreError::NotFound(name.to_string());
        }
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<Status>(&body) {
            Ok(status) => {
                // the status body repeats the code, trust it when present
                let code = if status.code != 0 { status.code } else { code };
                let message = if !status.message.is_empty() {
                    status.message
                } else if !status.reason.is_empty() {
                    status.reason
                } else {
                    body.trim().to_string()
                };
                StoreError::Api { code, message }
            }
            Err(_) => StoreError::Api {
                code,
                message: body.trim().to_string(),
            },
        }
    }
}

#[async_trait]
impl ConfigStore for RestConfigStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<ConfigMap, StoreError> {
        let url = self.resource_url(namespace, name);
        tracing::debug!("ConfigMap GET: {}", url);
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(self.response_error(name, response).await);
        }
        response
            .json::<ConfigMap>()
            .await
            .map_err(StoreError::from_reqwest)
    }

    async fn create(&self, namespace: &str, unit: &ConfigMap) -> Result<(), StoreError> {
        let url = self.collection_url(namespace);
        tracing::debug!("ConfigMap POST: {} ({})", url, unit.metadata.name);
        let response = self
            .request(Method::POST, &url)
            .json(unit)
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(self.response_error(&unit.metadata.name, response).await);
        }
        Ok(())
    }

    async fn update(&self, namespace: &str, unit: &ConfigMap) -> Result<(), StoreError> {
        let url = self.resource_url(namespace, &unit.metadata.name);
        tracing::debug!("ConfigMap PUT: {}", url);
        let response = self
            .request(Method::PUT, &url)
            .json(unit)
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(self.response_error(&unit.metadata.name, response).await);
        }
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let url = self.resource_url(namespace, name);
        tracing::debug!("ConfigMap DELETE: {}", url);
        let response = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(self.response_error(name, response).await);
        }
        Ok(())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<ConfigMap>, StoreError> {
        let url = self.collection_url(namespace);
        tracing::debug!("ConfigMap LIST: {}", url);
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(self.response_error(namespace, response).await);
        }
        let list = response
            .json::<ConfigMapList>()
            .await
            .map_err(StoreError::from_reqwest)?;
        Ok(list.items)
    }
}

/// In-memory ConfigStore for unit tests and cluster-free embedding.
/// 内存实现，用于单元测试与无集群环境
#[derive(Default)]
pub struct MemoryConfigStore {
    items: RwLock<HashMap<(String, String), ConfigMap>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored resource count across all namespaces.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<ConfigMap, StoreError> {
        let items = self.items.read().await;
        items
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn create(&self, namespace: &str, unit: &ConfigMap) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        let slot = (namespace.to_string(), unit.metadata.name.clone());
        if items.contains_key(&slot) {
            return Err(StoreError::Api {
                code: 409,
                message: format!("configmaps \"{}\" already exists", unit.metadata.name),
            });
        }
        items.insert(slot, unit.clone());
        Ok(())
    }

    async fn update(&self, namespace: &str, unit: &ConfigMap) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        let slot = (namespace.to_string(), unit.metadata.name.clone());
        match items.get_mut(&slot) {
            Some(existing) => {
                *existing = unit.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(unit.metadata.name.clone())),
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        items
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn list(&self, namespace: &str) -> Result<Vec<ConfigMap>, StoreError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, unit)| unit.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_store_urls() {
        let config = ConfigMapConfig {
            api_server: "https://k8s.example:6443/".to_string(),
            ..Default::default()
        };
        let store = RestConfigStore::new(&config).unwrap();
        assert_eq!(
            store.collection_url("default"),
            "https://k8s.example:6443/api/v1/namespaces/default/configmaps"
        );
        assert_eq!(
            store.resource_url("blobs", "abc123"),
            "https://k8s.example:6443/api/v1/namespaces/blobs/configmaps/abc123"
        );
    }

    #[test]
    fn test_rest_store_rejects_empty_server() {
        let config = ConfigMapConfig::default();
        assert!(RestConfigStore::new(&config).is_err());
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            StoreError::NotFound("x".into()).error_kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            StoreError::Timeout("t".into()).error_kind(),
            ErrorKind::DeadlineExceeded
        );
        assert_eq!(
            StoreError::Precondition("p".into()).error_kind(),
            ErrorKind::PreconditionFailed
        );
        assert_eq!(
            StoreError::Unsupported("signed urls").error_kind(),
            ErrorKind::Unimplemented
        );
        assert_eq!(
            StoreError::Api { code: 500, message: "boom".into() }.error_kind(),
            ErrorKind::Unknown
        );
        assert_eq!(
            StoreError::Transport("refused".into()).error_kind(),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_io_kind_mapping() {
        assert_eq!(
            StoreError::NotFound("x".into()).io_kind(),
            std::io::ErrorKind::NotFound
        );
        assert_eq!(
            StoreError::Timeout("t".into()).io_kind(),
            std::io::ErrorKind::TimedOut
        );
        assert_eq!(
            StoreError::Api { code: 500, message: "boom".into() }.io_kind(),
            std::io::ErrorKind::Other
        );
    }

    #[tokio::test]
    async fn test_memory_store_create_get_update_delete() {
        let store = MemoryConfigStore::new();
        let unit = ConfigMap::stored_unit("default", "n1", "k1", b"one".to_vec());
        store.create("default", &unit).await.unwrap();
        assert_eq!(store.len().await, 1);

        let fetched = store.get("default", "n1").await.unwrap();
        assert_eq!(fetched.payload(), b"one");

        // create on a taken name conflicts
        let dup = store.create("default", &unit).await.unwrap_err();
        assert!(matches!(dup, StoreError::Api { code: 409, .. }));

        let replacement = ConfigMap::stored_unit("default", "n1", "k1", b"two".to_vec());
        store.update("default", &replacement).await.unwrap();
        assert_eq!(store.get("default", "n1").await.unwrap().payload(), b"two");

        store.delete("default", "n1").await.unwrap();
        assert!(store.is_empty().await);
        assert!(matches!(
            store.delete("default", "n1").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_memory_store_update_missing_is_not_found() {
        let store = MemoryConfigStore::new();
        let unit = ConfigMap::stored_unit("default", "ghost", "k", Vec::new());
        assert!(matches!(
            store.update("default", &unit).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_memory_store_list_is_namespace_scoped() {
        let store = MemoryConfigStore::new();
        store
            .create("ns-a", &ConfigMap::stored_unit("ns-a", "n1", "k1", Vec::new()))
            .await
            .unwrap();
        store
            .create("ns-b", &ConfigMap::stored_unit("ns-b", "n2", "k2", Vec::new()))
            .await
            .unwrap();

        let listed = store.list("ns-a").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].metadata.name, "n1");
        assert!(store.list("ns-c").await.unwrap().is_empty());
    }
}
