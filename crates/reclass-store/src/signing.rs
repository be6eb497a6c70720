//! Request signing for the object store's authenticated upload/destroy calls.
//!
//! Parameters are sorted by name, joined as `name=value&…`, the API secret is
//! appended, and the result is hashed with SHA-256. `file`, `api_key`,
//! `resource_type`, `cloud_name` and `signature_algorithm` are never signed.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Algorithm name sent alongside the signature.
pub const SIGNATURE_ALGORITHM: &str = "sha256";

/// String that gets hashed, without the secret.
pub fn string_to_sign(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex-encoded SHA-256 signature of `params` under `secret`.
pub fn sign(params: &BTreeMap<&str, String>, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload_params() -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1700000000".to_string());
        params.insert("public_id", "abc_fixed".to_string());
        params.insert("overwrite", "false".to_string());
        params.insert("folder", "res-management".to_string());
        params.insert("access_mode", "public".to_string());
        params
    }

    #[test]
    fn test_string_to_sign_is_sorted() {
        assert_eq!(
            string_to_sign(&upload_params()),
            "access_mode=public&folder=res-management&overwrite=false&public_id=abc_fixed&timestamp=1700000000"
        );
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let mut params = BTreeMap::new();
        params.insert("folder", String::new());
        params.insert("public_id", "abc".to_string());
        assert_eq!(string_to_sign(&params), "public_id=abc");
    }

    #[test]
    fn test_sign_upload_vector() {
        assert_eq!(
            sign(&upload_params(), "s3cr3t"),
            "0e6b7dc2cc519adbb1d477c63eb8fa70102708b3a6303a5f5593cd29db30e79e"
        );
    }

    #[test]
    fn test_sign_destroy_vector() {
        let mut params = BTreeMap::new();
        params.insert("public_id", "abc".to_string());
        params.insert("timestamp", "1700000000".to_string());
        assert_eq!(
            sign(&params, "s3cr3t"),
            "ebdb7b2892254e3204f5bb2e5578fec0cfd500081c2b9d5663467bf5bf70b0f6"
        );
    }
}
