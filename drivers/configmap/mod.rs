//! Kubernetes ConfigMap 存储驱动 / Kubernetes ConfigMap storage driver
//!
//! Persists each object as one ConfigMap resource: the payload sits in
//! `binaryData`, the original key in `data`. Keys are hashed into
//! resource names, so any key round-trips regardless of the cluster's
//! naming rules.
//! 每个对象保存为一个 ConfigMap：内容在 binaryData，原始键名在 data。

mod config;
mod driver;
mod escape;
mod factory;
mod reader;
mod store;
mod types;
mod writer;

pub use config::ConfigMapConfig;
pub use driver::ConfigMapDriver;
pub use escape::escape_key;
pub use factory::{ConfigMapOpener, SCHEME};
pub use reader::ConfigMapReader;
pub use store::{ConfigStore, MemoryConfigStore, RestConfigStore, StoreError};
pub use types::{ConfigMap, ObjectMeta};
pub use writer::{CommitMode, ConfigMapWriter};
