//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::Result;

/// Resolve an absolute path against a base URL string.
pub fn resolve_endpoint(base_url: &str, path: &str) -> Result<Url> {
    Ok(Url::parse(base_url)?.join(path)?)
}

/// Extract the domain from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_endpoint() {
        assert_eq!(
            resolve_endpoint("https://dapi.kakao.com", "/v3/search/book")
                .unwrap()
                .as_str(),
            "https://dapi.kakao.com/v3/search/book"
        );
        assert_eq!(
            resolve_endpoint("http://localhost:8080/proxy/", "/v3/search/book")
                .unwrap()
                .as_str(),
            "http://localhost:8080/v3/search/book"
        );
        assert!(resolve_endpoint("not a url", "/v3/search/book").is_err());
    }

    #[test]
    fn test_get_domain() {
        assert_eq!(
            get_domain("https://dapi.kakao.com/v3/search/book"),
            Some("dapi.kakao.com".to_string())
        );
        assert_eq!(
            get_domain("https://sub.example.com:8080/path"),
            Some("sub.example.com".to_string())
        );
        assert_eq!(get_domain("nope"), None);
    }
}
