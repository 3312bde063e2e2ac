//! Object key escaping / 对象键名转义
//!
//! ConfigMap names must be valid DNS subdomains (lowercase alphanumerics,
//! `-` and `.`, max 253 chars). Object keys are arbitrary strings, so we
//! hash them into a fixed-width hex digest instead of escaping character
//! by character. The digest is not reversible, which is why the original
//! key is stored alongside the payload (see [`super::types`]).

/// Map an object key to a name acceptable to the cluster API.
/// 将对象键名映射为集群 API 可接受的资源名称
///
/// Pure and deterministic: the same key always yields the same name,
/// across calls and across processes.
pub fn escape_key(key: &str) -> String {
    format!("{:x}", md5::compute(key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_is_deterministic() {
        let a = escape_key("some/object key with spaces");
        let b = escape_key("some/object key with spaces");
        assert_eq!(a, b);
    }

    #[test]
    fn test_escape_known_digests() {
        // RFC 1321 test vectors, guards against a digest swap
        assert_eq!(escape_key(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(escape_key("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_escape_produces_legal_names() {
        let keys = [
            "plain",
            "a/b/c",
            "UPPER_case.and.dots",
            "空格 和 中文",
            "trailing/slash/",
            "..",
            "name-with-257-chars-padding-padding-padding-padding-padding",
        ];
        for key in keys {
            let name = escape_key(key);
            assert_eq!(name.len(), 32, "fixed width for {:?}", key);
            assert!(
                name.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
                "lowercase hex only for {:?}: {}",
                key,
                name
            );
        }
    }

    #[test]
    fn test_escape_distinct_keys_do_not_collide() {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        for i in 0..1000 {
            let key = format!("dir-{}/object-{}.bin", i % 7, i);
            assert!(seen.insert(escape_key(&key)), "collision on {}", key);
        }
    }
}
