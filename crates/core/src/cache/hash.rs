//! Request identity keys.
//!
//! Two requests address the same entry iff their method and canonical URL
//! are equal. Callers are expected to pass an already-canonicalized URL
//! (fragment stripped, host lowercased).

use sha2::{Digest, Sha256};

/// Compute the storage key for a request identity.
pub fn request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether requests with this method may be stored or matched.
pub fn is_cacheable_method(method: &str) -> bool {
    method.eq_ignore_ascii_case("GET")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let a = request_key("GET", "https://api.wmata.com/StationPrediction.svc/json/GetPrediction/A01");
        let b = request_key("GET", "https://api.wmata.com/StationPrediction.svc/json/GetPrediction/A01");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_method_case_insensitive() {
        assert_eq!(request_key("get", "https://app.test/"), request_key("GET", "https://app.test/"));
    }

    #[test]
    fn test_key_differs_by_method_and_url() {
        let base = request_key("GET", "https://app.test/index.html");
        assert_ne!(base, request_key("HEAD", "https://app.test/index.html"));
        assert_ne!(base, request_key("GET", "https://app.test/"));
        assert_ne!(base, request_key("GET", "https://app.test/index.html?v=2"));
    }

    #[test]
    fn test_key_format() {
        let key = request_key("GET", "https://app.test/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cacheable_method() {
        assert!(is_cacheable_method("GET"));
        assert!(is_cacheable_method("get"));
        assert!(!is_cacheable_method("POST"));
        assert!(!is_cacheable_method("HEAD"));
    }
}
