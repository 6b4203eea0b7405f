//! Endpoint configuration for `SearchClient`.

use url::Url;

use crate::error::ApiError;

/// Validated base URL of the engine (scheme, host, port, optional path prefix).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Build from separate parts, e.g. `("http", "localhost", "9200")`.
    pub fn new(scheme: &str, host: &str, port: &str) -> Result<Self, ApiError> {
        Self::parse(&format!("{scheme}://{host}:{port}"))
    }

    /// Parse a full URL such as `https://search.internal:9243/prefix`.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{raw}: unsupported scheme {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(ApiError::InvalidUrl(format!("{raw}: missing host")));
        }
        Ok(Self { url })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_are_joined() {
        let endpoint = Endpoint::new("http", "localhost", "9201").unwrap();
        assert_eq!(endpoint.base_url(), "http://localhost:9201");
    }

    #[test]
    fn path_prefix_is_kept() {
        let endpoint = Endpoint::parse("https://search.example.com/es/").unwrap();
        assert_eq!(endpoint.base_url(), "https://search.example.com/es");
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let err = Endpoint::parse("ftp://localhost:21").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Endpoint::parse("not a url").is_err());
        assert!(Endpoint::new("http", "", "9200").is_err());
    }
}
