use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

/// Error classes a driver reports to callers / 驱动向调用方报告的错误类别
///
/// Drivers keep their own error types internally; [`BlobDriver::error_code`]
/// is the single translation point into this taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Anything without a more precise class.
    Unknown,
    /// The keyed object does not exist.
    NotFound,
    /// A commit-time existence check failed before create or replace.
    PreconditionFailed,
    /// The backend has no concept for the operation.
    Unimplemented,
    /// A store call exceeded its deadline.
    DeadlineExceeded,
}

/// One listed object / 列表中的一个对象
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Caller-visible key, exactly as written / 调用方写入时的键名
    pub key: String,
    /// Payload size in bytes / 内容字节数
    pub size: u64,
    pub is_dir: bool,
}

/// Listing controls / 列表请求参数
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Continuation token from an earlier page, backends without
    /// pagination reject a non-empty token.
    pub page_token: Option<String>,
}

/// One page of listing results / 一页列表结果
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectEntry>,
    /// Token for the next page, `None` when this page is the last.
    pub next_page_token: Option<String>,
}

/// Object metadata, for backends that can answer [`BlobDriver::attributes`].
/// 对象元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectAttributes {
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

/// Blob storage driver interface (primitive operations only).
/// 对象存储驱动接口（仅原语操作）
#[async_trait]
pub trait BlobDriver: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &str;

    /// List objects, one page at a time / 分页列出对象
    async fn list_page(&self, opts: ListOptions) -> Result<ListPage>;

    /// Open a reader over one object. `offset`/`length` are best effort:
    /// backends without partial reads return the whole payload.
    /// 打开对象读取器，不支持范围读取的后端返回完整内容
    async fn new_range_reader(
        &self,
        key: &str,
        offset: u64,
        length: Option<u64>,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send>>;

    /// Open a writer; data becomes visible atomically on shutdown.
    /// 打开对象写入器，shutdown 时整体提交
    async fn new_writer(&self, key: &str) -> Result<Box<dyn AsyncWrite + Unpin + Send>>;

    /// Copy one object to another key (default: read then write).
    /// 复制对象（默认实现：读出再写入）
    async fn copy(&self, dst_key: &str, src_key: &str) -> Result<()> {
        use anyhow::Context;
        use tokio::io::AsyncWriteExt;

        let mut reader = self.new_range_reader(src_key, 0, None).await?;
        let mut writer = self.new_writer(dst_key).await?;
        tokio::io::copy(&mut reader, &mut writer)
            .await
            .with_context(|| format!("failed to copy object {} to {}", src_key, dst_key))?;
        // shutdown is the commit, a dropped writer commits nothing
        writer
            .shutdown()
            .await
            .with_context(|| format!("failed to commit copied object {}", dst_key))?;
        Ok(())
    }

    /// Delete one object; a missing key is an error, not a no-op.
    /// 删除对象，键不存在视为错误
    async fn delete(&self, key: &str) -> Result<()>;

    /// Object metadata / 对象元数据
    async fn attributes(&self, key: &str) -> Result<ObjectAttributes>;

    /// Pre-signed direct access URL / 预签名直链
    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<String>;

    /// Classify an error from any operation of this driver.
    /// 错误分类转换
    fn error_code(&self, err: &anyhow::Error) -> ErrorKind {
        for cause in err.chain() {
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

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(anyhow!("object key must not be empty"));
    }
    Ok(())
}

/// Caller-facing handle over one driver instance / 面向调用方的存储句柄
///
/// Stateless beyond the shared driver; cheap to clone and safe to share
/// across tasks.
#[derive(Clone)]
pub struct Bucket {
    driver: DriverBox,
}

impl Bucket {
    pub fn new(driver: Box<dyn BlobDriver>) -> Self {
        Self {
            driver: Arc::new(driver),
        }
    }

    pub fn driver_name(&self) -> &str {
        self.driver.name()
    }

    /// Read one object fully into memory / 读取整个对象
    pub async fn read_all(&self, key: &str) -> Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        check_key(key)?;
        let mut reader = self.driver.new_range_reader(key, 0, None).await?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        Ok(data)
    }

    /// Write one object in a single call / 一次调用写入整个对象
    pub async fn write_all(&self, key: &str, data: &[u8]) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        check_key(key)?;
        let mut writer = self.driver.new_writer(key).await?;
        writer.write_all(data).await?;
        writer.shutdown().await?;
        Ok(())
    }

    /// Streaming reader over one object / 对象流式读取器
    pub async fn new_reader(&self, key: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        check_key(key)?;
        self.driver.new_range_reader(key, 0, None).await
    }

    pub async fn new_range_reader(
        &self,
        key: &str,
        offset: u64,
        length: Option<u64>,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        check_key(key)?;
        self.driver.new_range_reader(key, offset, length).await
    }

    /// Streaming writer, committed on shutdown / 对象流式写入器
    pub async fn new_writer(&self, key: &str) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
        check_key(key)?;
        self.driver.new_writer(key).await
    }

    /// All objects of the bucket in one page / 单页列出全部对象
    pub async fn list(&self) -> Result<Vec<ObjectEntry>> {
        let page = self.driver.list_page(ListOptions::default()).await?;
        Ok(page.objects)
    }

    pub async fn list_page(&self, opts: ListOptions) -> Result<ListPage> {
        self.driver.list_page(opts).await
    }

    pub async fn copy(&self, dst_key: &str, src_key: &str) -> Result<()> {
        check_key(dst_key)?;
        check_key(src_key)?;
        self.driver.copy(dst_key, src_key).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.driver.delete(key).await
    }

    pub async fn attributes(&self, key: &str) -> Result<ObjectAttributes> {
        check_key(key)?;
        self.driver.attributes(key).await
    }

    pub async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<String> {
        check_key(key)?;
        self.driver.signed_url(key, expires_in).await
    }

    /// Classify an error returned by any method of this bucket.
    /// 对本桶任一方法返回的错误进行分类
    pub fn error_code(&self, err: &anyhow::Error) -> ErrorKind {
        self.driver.error_code(err)
    }
}

pub mod manager;

pub use manager::{BucketManager, BucketOpener, DriverBox, OpenerBox};
