//! Cluster API resource types / 集群 API 资源类型
//!
//! Only the handful of ConfigMap fields this driver touches are modeled;
//! unknown fields in API responses are ignored. `binaryData` travels as
//! base64 strings on the wire, decoded bytes in memory.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// API version every request and stored resource carries.
pub const API_VERSION: &str = "v1";
/// Resource kind of a stored unit.
pub const KIND_CONFIG_MAP: &str = "ConfigMap";

/// binaryData field holding the object payload / 保存对象内容的二进制字段
pub const PAYLOAD_FIELD: &str = "file";
/// data field recording the original object key / 记录原始对象键名的字段
pub const ORIGINAL_KEY_FIELD: &str = "filename";

/// Standard object metadata / 标准资源元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// A ConfigMap resource as the API server sends and receives it.
/// 与 API 服务器收发的 ConfigMap 资源
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,
    #[serde(
        default,
        with = "base64_map",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub binary_data: HashMap<String, Vec<u8>>,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND_CONFIG_MAP.to_string()
}

impl ConfigMap {
    /// Build the stored unit for one object: payload under [`PAYLOAD_FIELD`],
    /// the literal key under [`ORIGINAL_KEY_FIELD`].
    /// 构造一个对象的存储单元
    pub fn stored_unit(namespace: &str, name: &str, key: &str, payload: Vec<u8>) -> Self {
        let mut data = HashMap::new();
        data.insert(ORIGINAL_KEY_FIELD.to_string(), key.to_string());
        let mut binary_data = HashMap::new();
        binary_data.insert(PAYLOAD_FIELD.to_string(), payload);
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: namespace.to_string(),
                ..Default::default()
            },
            data,
            binary_data,
        }
    }

    /// The object key recorded at write time, `None` when this config map
    /// was not written by this driver.
    pub fn original_key(&self) -> Option<&str> {
        self.data.get(ORIGINAL_KEY_FIELD).map(String::as_str)
    }

    /// Payload bytes, empty when the field is absent.
    pub fn payload(&self) -> &[u8] {
        self.binary_data
            .get(PAYLOAD_FIELD)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Consume the resource and take the payload without copying.
    pub fn into_payload(mut self) -> Vec<u8> {
        self.binary_data.remove(PAYLOAD_FIELD).unwrap_or_default()
    }
}

/// List response for a ConfigMap collection / ConfigMap 集合的列表响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigMapList {
    #[serde(default)]
    pub items: Vec<ConfigMap>,
}

/// Error body the API server returns on failed calls.
/// API 服务器在调用失败时返回的错误体
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub code: u16,
}

/// Serde adapter for `binaryData`: map of base64 strings on the wire.
mod base64_map {
    use std::collections::HashMap;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(
        map: &HashMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded: HashMap<&str, String> = map
            .iter()
            .map(|(field, bytes)| (field.as_str(), STANDARD.encode(bytes)))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<String, Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = HashMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(field, text)| {
                STANDARD
                    .decode(text.as_bytes())
                    .map(|bytes| (field, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_unit_shape() {
        let unit = ConfigMap::stored_unit("default", "abc123", "dir/report.txt", b"hi".to_vec());
        assert_eq!(unit.api_version, "v1");
        assert_eq!(unit.kind, "ConfigMap");
        assert_eq!(unit.metadata.name, "abc123");
        assert_eq!(unit.metadata.namespace, "default");
        assert_eq!(unit.original_key(), Some("dir/report.txt"));
        assert_eq!(unit.payload(), b"hi");
    }

    #[test]
    fn test_binary_data_serializes_as_base64() {
        let unit = ConfigMap::stored_unit("default", "abc123", "test-object", b"hello world!".to_vec());
        let value = serde_json::to_value(&unit).unwrap();
        assert_eq!(value["binaryData"]["file"], "aGVsbG8gd29ybGQh");
        assert_eq!(value["data"]["filename"], "test-object");
        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["kind"], "ConfigMap");
        assert_eq!(value["metadata"]["name"], "abc123");
    }

    #[test]
    fn test_deserialize_api_response() {
        // shape as the API server returns it, including fields we ignore
        let raw = r#"{
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": "abc123",
                "namespace": "default",
                "resourceVersion": "4711",
                "creationTimestamp": "2024-01-01T00:00:00Z",
                "uid": "d2f1",
                "managedFields": []
            },
            "data": { "filename": "test-object" },
            "binaryData": { "file": "aGVsbG8gd29ybGQh" },
            "immutable": false
        }"#;
        let unit: ConfigMap = serde_json::from_str(raw).unwrap();
        assert_eq!(unit.original_key(), Some("test-object"));
        assert_eq!(unit.payload(), b"hello world!");
        assert_eq!(unit.metadata.resource_version.as_deref(), Some("4711"));
        assert_eq!(unit.into_payload(), b"hello world!".to_vec());
    }

    #[test]
    fn test_deserialize_foreign_config_map() {
        // a config map some other tool created, no payload and no key record
        let raw = r#"{
            "metadata": { "name": "kube-root-ca.crt", "namespace": "default" },
            "data": { "ca.crt": "----" }
        }"#;
        let unit: ConfigMap = serde_json::from_str(raw).unwrap();
        assert_eq!(unit.original_key(), None);
        assert!(unit.payload().is_empty());
        assert_eq!(unit.api_version, "v1");
    }

    #[test]
    fn test_deserialize_rejects_bad_base64() {
        let raw = r#"{
            "metadata": { "name": "x" },
            "binaryData": { "file": "not base64 at all!" }
        }"#;
        assert!(serde_json::from_str::<ConfigMap>(raw).is_err());
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let unit = ConfigMap::stored_unit("default", "n", "empty", Vec::new());
        let text = serde_json::to_string(&unit).unwrap();
        let back: ConfigMap = serde_json::from_str(&text).unwrap();
        assert_eq!(back.payload(), b"");
        assert_eq!(back.original_key(), Some("empty"));
    }

    #[test]
    fn test_status_body_decodes() {
        let raw = r#"{
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": "configmaps \"abc\" not found",
            "reason": "NotFound",
            "code": 404
        }"#;
        let status: Status = serde_json::from_str(raw).unwrap();
        assert_eq!(status.code, 404);
        assert_eq!(status.reason, "NotFound");
        assert!(status.message.contains("not found"));
    }
}
