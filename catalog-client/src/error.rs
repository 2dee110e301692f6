use reqwest::Method;
use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Failures talking to the catalog backend
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Non-200 response; carries everything needed to diagnose the call
    #[error("Failed to request {method} {url}: {status} -- {body}")]
    Backend {
        method: Method,
        url: String,
        status: u16,
        body: String,
    },

    /// Connection refused, timeout, broken body stream
    #[error("Catalog transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Payload that does not have the expected shape
    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid catalog URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl CatalogError {
    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    /// Backend and transport failures are worth another attempt; bad data is not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { .. } | Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_message() {
        let err = CatalogError::Backend {
            method: Method::GET,
            url: "http://consul:123/v1/foo/bar".to_string(),
            status: 300,
            body: r#"{"foo": "bar"}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"Failed to request GET http://consul:123/v1/foo/bar: 300 -- {"foo": "bar"}"#
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_decode_error_is_not_retryable() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CatalogError::decode("response body", source);
        assert!(!err.is_retryable());
        assert!(err.to_string().starts_with("Failed to decode response body"));
    }
}
