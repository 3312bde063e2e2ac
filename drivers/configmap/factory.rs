//! Bucket opener for the `kubernetes` scheme / kubernetes scheme 的桶开启器

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use url::Url;

use super::config::ConfigMapConfig;
use super::driver::ConfigMapDriver;
use super::store::{ConfigStore, RestConfigStore};
use crate::storage::{BlobDriver, BucketOpener};

/// URL scheme this driver registers under.
pub const SCHEME: &str = "kubernetes";

/// Connection state shared by every bucket this opener hands out.
struct SharedStore {
    store: Arc<RestConfigStore>,
    /// Used when the bucket URL names no namespace.
    default_namespace: String,
}

/// Namespace for one bucket URL: the host part wins, otherwise the
/// configured default.
fn bucket_namespace(url: &Url, default_namespace: &str) -> String {
    match url.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => default_namespace.to_string(),
    }
}

/// Opener for `kubernetes://<namespace>` bucket URLs.
/// `kubernetes://<namespace>` 桶 URL 的开启器
///
/// The store connection is built exactly once, on the first open; every
/// later open shares that outcome, including a failed one. A process
/// started without usable settings keeps reporting its first error.
pub struct ConfigMapOpener {
    /// Explicit settings; `None` loads from the environment on first use.
    config: Option<ConfigMapConfig>,
    init: OnceCell<Result<SharedStore, String>>,
}

impl ConfigMapOpener {
    /// Opener configured from the environment at first use.
    /// 首次使用时从环境变量加载配置
    pub fn new() -> Self {
        Self {
            config: None,
            init: OnceCell::new(),
        }
    }

    /// Opener with explicit settings, for tests and embedding.
    /// 使用显式配置的开启器
    pub fn with_config(config: ConfigMapConfig) -> Self {
        Self {
            config: Some(config),
            init: OnceCell::new(),
        }
    }

    fn shared(&self) -> &Result<SharedStore, String> {
        self.init.get_or_init(|| {
            let config = match &self.config {
                Some(config) => config.clone(),
                None => ConfigMapConfig::from_env().map_err(|e| e.to_string())?,
            };
            let store = RestConfigStore::new(&config).map_err(|e| e.to_string())?;
            tracing::info!(
                "ConfigMap 存储已连接: {} (namespace={})",
                config.api_server,
                config.namespace
            );
            Ok(SharedStore {
                store: Arc::new(store),
                default_namespace: config.namespace,
            })
        })
    }
}

impl Default for ConfigMapOpener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BucketOpener for ConfigMapOpener {
    fn scheme(&self) -> &'static str {
        SCHEME
    }

    async fn open_bucket(&self, url: &Url) -> Result<Box<dyn BlobDriver>> {
        let shared = match self.shared() {
            Ok(shared) => shared,
            Err(message) => return Err(anyhow!("open bucket {}: {}", url, message)),
        };
        let namespace = bucket_namespace(url, &shared.default_namespace);
        let store = Arc::clone(&shared.store) as Arc<dyn ConfigStore>;
        Ok(Box::new(ConfigMapDriver::new(store, &namespace)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opener_config(server: &str) -> ConfigMapConfig {
        ConfigMapConfig {
            api_server: server.to_string(),
            namespace: "fallback".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_bucket_namespace_from_url_host() {
        let url = Url::parse("kubernetes://tenant-a").unwrap();
        assert_eq!(bucket_namespace(&url, "default"), "tenant-a");

        let bare = Url::parse("kubernetes:").unwrap();
        assert_eq!(bucket_namespace(&bare, "default"), "default");
    }

    #[tokio::test]
    async fn test_open_bucket_without_touching_the_cluster() {
        let opener = ConfigMapOpener::with_config(opener_config("https://k8s.test:6443/"));
        let url = Url::parse("kubernetes://tenant-a").unwrap();

        let driver = opener.open_bucket(&url).await.unwrap();
        assert_eq!(driver.name(), "configmap");

        // later opens share the initialized connection
        let again = opener.open_bucket(&url).await.unwrap();
        assert_eq!(again.name(), "configmap");
    }

    #[tokio::test]
    async fn test_failed_init_is_cached() {
        // empty api_server makes store construction fail deterministically
        let opener = ConfigMapOpener::with_config(ConfigMapConfig::default());
        let url = Url::parse("kubernetes://x").unwrap();

        let first = opener.open_bucket(&url).await.err().unwrap().to_string();
        let second = opener.open_bucket(&url).await.err().unwrap().to_string();
        assert!(first.contains("open bucket"), "{first}");
        assert!(first.contains("api_server"), "{first}");
        assert_eq!(first, second, "first failure is shared by every later open");
    }
}
