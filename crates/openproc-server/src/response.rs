//! Response mapping.
//!
//! Every response carries `Content-Type: application/json`, success or not.
//! Error bodies are always an [`OpenApiErrorResponse`].

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::{Method, Response, StatusCode};
use http_body_util::Full;
use openproc_core::{OpenApiErrorResponse, ProcedureError, StatusTable};
use serde_json::Value;

/// Type alias for the response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

const JSON: HeaderValue = HeaderValue::from_static("application/json");

/// Writes a procedure result with the route's declared status.
///
/// A 204 is always written without a body; any output is dropped.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use openproc_server::response::success;
/// use serde_json::{json, Value};
///
/// let response = success(StatusCode::CREATED, &json!({"id": 1}));
/// assert_eq!(response.status(), StatusCode::CREATED);
///
/// let response = success(StatusCode::NO_CONTENT, &Value::Null);
/// assert_eq!(response.headers()["content-type"], "application/json");
/// ```
#[must_use]
pub fn success(status: StatusCode, output: &Value) -> HttpResponse {
    if status == StatusCode::NO_CONTENT {
        if !output.is_null() {
            tracing::debug!("dropping procedure output on a 204 response");
        }
        return json_response(status, Bytes::new());
    }

    match serde_json::to_vec(output) {
        Ok(body) => json_response(status, Bytes::from(body)),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize procedure output");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                &StatusTable::new().map(&ProcedureError::internal("serialization failed")).1,
            )
        }
    }
}

/// Maps an error through the status table.
///
/// `allow` lists the methods for a 405 and becomes the `Allow` header.
#[must_use]
pub fn failure(statuses: &StatusTable, error: &ProcedureError, allow: Option<&[Method]>) -> HttpResponse {
    let (status, body) = statuses.map(error);
    let mut response = error_body(status, &body);

    if let Some(methods) = allow {
        let joined = methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = HeaderValue::from_str(&joined) {
            response.headers_mut().insert(ALLOW, value);
        }
    }

    response
}

/// Writes an already-mapped error body.
#[must_use]
pub fn error_body(status: StatusCode, body: &OpenApiErrorResponse) -> HttpResponse {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| {
        br#"{"message":"Internal server error","code":"INTERNAL_SERVER_ERROR"}"#.to_vec()
    });
    json_response(status, Bytes::from(bytes))
}

fn json_response(status: StatusCode, body: Bytes) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON)
        .body(Full::new(body))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use openproc_core::{issue_at, ErrorCode};
    use serde_json::json;

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_success_uses_declared_status() {
        let response = success(StatusCode::CREATED, &json!({"id": 1, "name": "a"}));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_json(response).await, json!({"id": 1, "name": "a"}));
    }

    #[tokio::test]
    async fn test_null_on_204_has_no_body() {
        let response = success(StatusCode::NO_CONTENT, &Value::Null);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_output_on_204_is_dropped() {
        let response = success(StatusCode::NO_CONTENT, &json!({"deleted": true}));
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_null_on_200_is_written() {
        let response = success(StatusCode::OK, &Value::Null);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"null");
    }

    #[tokio::test]
    async fn test_failure_with_issues() {
        let error = ProcedureError::validation(vec![issue_at(&["name"], "Required")]);
        let response = failure(&StatusTable::new(), &error, None);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let body = body_json(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(body["issues"][0]["path"], json!(["name"]));
    }

    #[tokio::test]
    async fn test_failure_hides_internal_message() {
        let error = ProcedureError::internal("db password rejected");
        let response = failure(&StatusTable::new(), &error, None);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("issues").is_none());
    }

    #[test]
    fn test_failure_sets_allow() {
        let error = ProcedureError::new(ErrorCode::MethodNotSupported, "Method not allowed");
        let response = failure(
            &StatusTable::new(),
            &error,
            Some(&[Method::GET, Method::POST]),
        );

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, POST");
    }
}
