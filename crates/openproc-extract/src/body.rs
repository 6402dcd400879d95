//! Size-limited body collection.
//!
//! A declared `Content-Length` over the limit is rejected before any byte is
//! read. Otherwise the body is collected through [`Limited`], which aborts as
//! soon as the running total crosses the limit.

use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::HeaderMap;
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::ExtractionError;

/// Returns the declared `Content-Length`, if present and well-formed.
#[must_use]
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Collects a request body, enforcing `limit` when one is set.
///
/// # Example
///
/// ```rust
/// # tokio_test::block_on(async {
/// use bytes::Bytes;
/// use http_body_util::Full;
/// use openproc_extract::read_body;
///
/// let body = Full::new(Bytes::from_static(b"hello"));
/// assert!(read_body(body, None, Some(4)).await.unwrap_err().is_payload_too_large());
/// # });
/// ```
///
/// # Errors
///
/// Returns a payload-too-large error when the declared or streamed length
/// exceeds `limit`, or a body-read error when the stream fails.
pub async fn read_body<B>(
    body: B,
    declared_length: Option<u64>,
    limit: Option<usize>,
) -> Result<Bytes, ExtractionError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let Some(limit) = limit else {
        return body
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| {
                let e: Box<dyn std::error::Error + Send + Sync> = e.into();
                ExtractionError::body_read(e.to_string())
            });
    };

    if let Some(declared) = declared_length {
        if declared > u64::try_from(limit).unwrap_or(u64::MAX) {
            tracing::debug!(declared, limit, "body rejected by declared length");
            return Err(ExtractionError::payload_too_large(limit, Some(declared)));
        }
    }

    Limited::new(body, limit)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                tracing::debug!(limit, "body stream crossed limit");
                ExtractionError::payload_too_large(limit, None)
            } else {
                ExtractionError::body_read(e.to_string())
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use http_body_util::{Empty, Full};

    #[test]
    fn test_content_length_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), None);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert_eq!(content_length(&headers), Some(42));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("abc"));
        assert_eq!(content_length(&headers), None);
    }

    #[tokio::test]
    async fn test_read_within_limit() {
        let body = Full::new(Bytes::from_static(b"{\"a\":1}"));
        let bytes = read_body(body, Some(7), Some(7)).await.unwrap();
        assert_eq!(&bytes[..], b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_declared_length_rejected_early() {
        let body = Full::new(Bytes::from_static(b"tiny"));
        let err = read_body(body, Some(10_000), Some(100)).await.unwrap_err();
        assert!(err.is_payload_too_large());
        assert!(err.to_string().contains("10000"));
    }

    #[tokio::test]
    async fn test_streamed_length_rejected() {
        let body = Full::new(Bytes::from(vec![b'x'; 64]));
        let err = read_body(body, None, Some(16)).await.unwrap_err();
        assert!(err.is_payload_too_large());
    }

    #[tokio::test]
    async fn test_unlimited() {
        let body = Full::new(Bytes::from(vec![b'x'; 4096]));
        let bytes = read_body(body, Some(4096), None).await.unwrap();
        assert_eq!(bytes.len(), 4096);
    }

    #[tokio::test]
    async fn test_empty_body() {
        let bytes = read_body(Empty::<Bytes>::new(), None, Some(1)).await.unwrap();
        assert!(bytes.is_empty());
    }
}
