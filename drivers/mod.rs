// Driver package / 驱动包
pub mod configmap;

use crate::storage::BucketManager;

/// Register all bucket drivers to the manager / 注册所有桶驱动
pub async fn register_all(manager: &BucketManager) -> anyhow::Result<()> {
    // Kubernetes ConfigMap driver / Kubernetes ConfigMap 驱动
    manager
        .register_opener(Box::new(configmap::ConfigMapOpener::new()))
        .await?;
    Ok(())
}
