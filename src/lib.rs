pub mod storage;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

// Register all bucket drivers (call unified registration function from drivers module) / 注册所有桶驱动
pub async fn register_bucket_drivers(manager: &storage::BucketManager) -> anyhow::Result<()> {
    drivers::register_all(manager).await
}
