use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use url::Url;

use super::{BlobDriver, Bucket};

pub type DriverBox = Arc<Box<dyn BlobDriver>>;
pub type OpenerBox = Arc<Box<dyn BucketOpener>>;

/// Bucket opener trait, one per URL scheme / 桶开启器，每个 URL scheme 一个
///
/// Openers own whatever shared state their backend needs (connections,
/// credentials) and hand out one driver per opened bucket.
#[async_trait]
pub trait BucketOpener: Send + Sync {
    /// URL scheme this opener serves / 本开启器负责的 scheme
    fn scheme(&self) -> &'static str;

    /// Open a driver for one bucket URL / 为一个桶 URL 打开驱动
    async fn open_bucket(&self, url: &Url) -> Result<Box<dyn BlobDriver>>;
}

/// Bucket manager: scheme registry and dispatch / 桶管理器：scheme 注册与分发
#[derive(Clone)]
pub struct BucketManager {
    openers: Arc<RwLock<HashMap<String, OpenerBox>>>,
}

impl BucketManager {
    pub fn new() -> Self {
        Self {
            openers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a bucket opener / 注册桶开启器
    pub async fn register_opener(&self, opener: Box<dyn BucketOpener>) -> Result<()> {
        let scheme = opener.scheme().to_string();
        let opener_box = Arc::new(opener);

        let mut openers = self.openers.write().await;
        openers.insert(scheme.clone(), opener_box);

        tracing::info!("Bucket opener registered: {}", scheme);
        Ok(())
    }

    /// Open a bucket from its URL, e.g. `kubernetes://my-namespace`.
    /// 根据 URL 打开存储桶
    pub async fn open_bucket(&self, bucket_url: &str) -> Result<Bucket> {
        let url = Url::parse(bucket_url)
            .with_context(|| format!("invalid bucket url: {}", bucket_url))?;

        let opener = {
            let openers = self.openers.read().await;
            openers.get(url.scheme()).cloned()
        }
        .ok_or_else(|| anyhow!("no bucket opener registered for scheme: {}", url.scheme()))?;

        let driver = opener.open_bucket(&url).await?;
        tracing::info!("Bucket opened: {} ({})", bucket_url, driver.name());
        Ok(Bucket::new(driver))
    }

    /// All registered schemes / 所有已注册的 scheme
    pub async fn schemes(&self) -> Vec<String> {
        let openers = self.openers.read().await;
        openers.keys().cloned().collect()
    }
}

impl Default for BucketManager {
    fn default() -> Self {
        Self::new()
    }
}
