//! Driver configuration / 驱动配置

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// API server address, e.g. `https://10.96.0.1:443`.
pub const ENV_API_SERVER: &str = "KUBE_API_SERVER";
/// Service-account bearer token, optional.
pub const ENV_TOKEN: &str = "KUBE_TOKEN";
/// Namespace the objects live in.
pub const ENV_NAMESPACE: &str = "KUBE_NAMESPACE";
/// Per-call deadline in seconds.
pub const ENV_TIMEOUT_SECS: &str = "KUBE_TIMEOUT_SECS";
/// Accept self-signed API server certificates when `1` or `true`.
pub const ENV_INSECURE_SKIP_TLS: &str = "KUBE_INSECURE_SKIP_TLS";

// injected by the kubelet into every pod
const ENV_SERVICE_HOST: &str = "KUBERNETES_SERVICE_HOST";
const ENV_SERVICE_PORT: &str = "KUBERNETES_SERVICE_PORT";

/// Connection settings for the cluster config store.
/// 集群配置存储的连接设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMapConfig {
    /// API server base address / API 服务器地址
    pub api_server: String,
    /// Bearer token, empty for unauthenticated access / 认证令牌
    #[serde(default)]
    pub token: String,
    /// Default namespace when the bucket URL names none / 默认命名空间
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Deadline applied to every store call / 每次存储调用的超时
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Skip TLS certificate verification (self-signed clusters) / 跳过TLS证书验证
    #[serde(default)]
    pub insecure_skip_tls: bool,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_timeout_secs() -> u64 {
    2
}

impl Default for ConfigMapConfig {
    fn default() -> Self {
        Self {
            api_server: String::new(),
            token: String::new(),
            namespace: default_namespace(),
            timeout_secs: default_timeout_secs(),
            insecure_skip_tls: false,
        }
    }
}

impl ConfigMapConfig {
    /// Load connection settings from the environment, falling back to the
    /// in-cluster service address when no explicit server is configured.
    /// 从环境变量加载连接配置
    pub fn from_env() -> Result<Self> {
        let api_server = env_nonempty(ENV_API_SERVER)
            .or_else(in_cluster_server)
            .ok_or_else(|| {
                anyhow!(
                    "{} is not set and no in-cluster address is available",
                    ENV_API_SERVER
                )
            })?;
        let timeout_secs = match env_nonempty(ENV_TIMEOUT_SECS) {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("invalid {}: {}", ENV_TIMEOUT_SECS, raw))?,
            None => default_timeout_secs(),
        };
        Ok(Self {
            api_server,
            token: env_nonempty(ENV_TOKEN).unwrap_or_default(),
            namespace: env_nonempty(ENV_NAMESPACE).unwrap_or_else(default_namespace),
            timeout_secs,
            insecure_skip_tls: matches!(
                env_nonempty(ENV_INSECURE_SKIP_TLS).as_deref(),
                Some("1") | Some("true")
            ),
        })
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn in_cluster_server() -> Option<String> {
    let host = env_nonempty(ENV_SERVICE_HOST)?;
    let port = env_nonempty(ENV_SERVICE_PORT)?;
    Some(format!("https://{}:{}", host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_defaults() {
        let config: ConfigMapConfig =
            serde_json::from_value(serde_json::json!({ "api_server": "https://k8s:6443" }))
                .unwrap();
        assert_eq!(config.api_server, "https://k8s:6443");
        assert_eq!(config.namespace, "default");
        assert_eq!(config.timeout_secs, 2);
        assert!(config.token.is_empty());
        assert!(!config.insecure_skip_tls);
    }

    // one test covers all env phases so parallel tests never race on the vars
    #[test]
    fn test_from_env() {
        std::env::set_var(ENV_API_SERVER, "https://k8s.example:6443");
        std::env::set_var(ENV_TOKEN, "tok-1");
        std::env::set_var(ENV_NAMESPACE, "blobs");
        std::env::set_var(ENV_TIMEOUT_SECS, "5");
        std::env::set_var(ENV_INSECURE_SKIP_TLS, "true");
        let config = ConfigMapConfig::from_env().unwrap();
        assert_eq!(config.api_server, "https://k8s.example:6443");
        assert_eq!(config.token, "tok-1");
        assert_eq!(config.namespace, "blobs");
        assert_eq!(config.timeout_secs, 5);
        assert!(config.insecure_skip_tls);

        // explicit server absent, in-cluster address takes over
        std::env::remove_var(ENV_API_SERVER);
        std::env::set_var(ENV_SERVICE_HOST, "10.96.0.1");
        std::env::set_var(ENV_SERVICE_PORT, "443");
        let config = ConfigMapConfig::from_env().unwrap();
        assert_eq!(config.api_server, "https://10.96.0.1:443");

        // bad timeout is an error, not a silent default
        std::env::set_var(ENV_TIMEOUT_SECS, "soon");
        assert!(ConfigMapConfig::from_env().is_err());
        std::env::remove_var(ENV_TIMEOUT_SECS);

        // nothing set at all
        std::env::remove_var(ENV_SERVICE_HOST);
        std::env::remove_var(ENV_SERVICE_PORT);
        std::env::remove_var(ENV_TOKEN);
        std::env::remove_var(ENV_NAMESPACE);
        std::env::remove_var(ENV_INSECURE_SKIP_TLS);
        let err = ConfigMapConfig::from_env().unwrap_err();
        assert!(err.to_string().contains(ENV_API_SERVER));
    }
}
