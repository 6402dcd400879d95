//! Config-driven wiring through the facade.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full};
use openproc::prelude::*;
use serde_json::{json, Value};

fn config() -> OpenprocConfig {
    ConfigLoader::new()
        .with_string(
            r#"
            [handler]
            max_body_size = 32

            [server]
            base_path = "/api"
            request_timeout_secs = 5
            "#,
            "toml",
        )
        .unwrap()
        .load_unvalidated()
}

fn routes() -> RouteTable {
    RouteTable::new([RouteDefinition::post("/notes", "createNote")
        .input(Schema::object().field("text", Schema::string().min_length(1)))
        .output(Schema::object().field("text", Schema::string()))
        .status(StatusCode::CREATED)
        .summary("Create a note")
        .build()
        .unwrap()])
    .unwrap()
}

fn server(config: &OpenprocConfig) -> Server {
    let mut registry = ProcedureRegistry::new();
    registry.register_raw("createNote", |_ctx, input: Value| async move { Ok(input) });

    let handler = openproc::handler_builder(config)
        .routes(routes())
        .registry(registry)
        .build()
        .unwrap();
    Server::new(openproc::server_config(config), handler)
}

fn post(uri: &str, body: &'static str) -> Request<Full<Bytes>> {
    Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

#[tokio::test]
async fn test_config_base_path_and_limit_apply() {
    let config = config();
    let server = server(&config);

    let response = server.handle_request(post("/api/notes", r#"{"text":"hi"}"#)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), json!({"text": "hi"}));

    let response = server
        .handle_request(post("/api/notes", r#"{"text":"this note is longer than the limit"}"#))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = server.handle_request(post("/notes", r#"{"text":"hi"}"#)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_docs_follow_routes() {
    let doc = OpenApiGenerator::new()
        .title("Notes")
        .version("1.0.0")
        .server("/api", None)
        .generate(&routes())
        .unwrap();

    let op = doc.paths["/notes"].post.as_ref().unwrap();
    assert_eq!(op.operation_id, "createNote");
    assert_eq!(op.summary.as_deref(), Some("Create a note"));
    assert!(op.responses.contains_key("201"));
    assert!(op.request_body.as_ref().unwrap().required);
}
