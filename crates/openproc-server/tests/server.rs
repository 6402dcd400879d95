//! Adapter rules and a real socket round trip through `Server`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use openproc_core::{ProcedureError, ProcedureRegistry, RouteDefinition, RouteTable, Schema, REQUEST_ID_HEADER};
use openproc_server::{ErrorKind, HttpResponse, OpenApiHandler, Server, ServerConfig, ShutdownSignal};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};

fn handler_with_hook(kinds: Arc<Mutex<Vec<ErrorKind>>>) -> OpenApiHandler {
    let routes = RouteTable::new([
        RouteDefinition::get("/users/{id}", "getUser")
            .input(Schema::object().field("id", Schema::integer()))
            .build()
            .unwrap(),
        RouteDefinition::post("/echo", "echo")
            .input(Schema::object().field("message", Schema::string()))
            .build()
            .unwrap(),
        RouteDefinition::get("/slow", "slow").build().unwrap(),
    ])
    .unwrap();

    let mut registry = ProcedureRegistry::new();
    registry.register_raw("getUser", |_ctx, input: Value| async move { Ok(input) });
    registry.register_raw("echo", |_ctx, input: Value| async move { Ok(input) });
    registry.register_raw("slow", |_ctx, _input: Value| async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Value::Null)
    });

    OpenApiHandler::builder()
        .routes(routes)
        .registry(registry)
        .on_error(move |report| kinds.lock().unwrap().push(report.kind))
        .build()
        .unwrap()
}

fn server(config: ServerConfig) -> (Server, Arc<Mutex<Vec<ErrorKind>>>) {
    let kinds: Arc<Mutex<Vec<ErrorKind>>> = Arc::default();
    let handler = handler_with_hook(Arc::clone(&kinds));
    (Server::new(config, handler), kinds)
}

fn get(uri: &str) -> Request<Full<Bytes>> {
    Request::get(uri).body(Full::new(Bytes::new())).unwrap()
}

async fn body_json(response: HttpResponse) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_head_is_empty_204() {
    let (server, kinds) = server(ServerConfig::default());
    let request = Request::head("/anything/at/all").body(Full::new(Bytes::new())).unwrap();

    let response = server.handle_request(request).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
    assert!(kinds.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_base_path_is_stripped() {
    let config = ServerConfig::builder().base_path("/api/").build();
    let (server, _) = server(config);

    let response = server.handle_request(get("/api/users/3")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"id": 3}));
}

#[tokio::test]
async fn test_outside_base_path_is_404() {
    let config = ServerConfig::builder().base_path("/api").build();
    let (server, kinds) = server(config);

    let response = server.handle_request(get("/apiary/users/3")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    assert_eq!(*kinds.lock().unwrap(), vec![ErrorKind::NotFound]);
}

#[tokio::test]
async fn test_duplicate_slashes_are_normalized() {
    let (server, _) = server(ServerConfig::default());

    let response = server.handle_request(get("//users///8/?verbose=1")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"id": 8}));
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let (server, _) = server(ServerConfig::default());

    let response = server.handle_request(get("/users/1")).await;

    let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_slow_procedure_times_out_with_504() {
    let config = ServerConfig::builder()
        .request_timeout(Some(Duration::from_millis(50)))
        .build();
    let (server, kinds) = server(config);

    let response = server.handle_request(get("/slow")).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let body = body_json(response).await;
    assert_eq!(body["code"], "GATEWAY_TIMEOUT");
    assert_eq!(body["message"], "Request timed out");
    assert_eq!(*kinds.lock().unwrap(), vec![ErrorKind::Timeout]);
}

#[tokio::test]
async fn test_timeout_report_shares_request_id_and_procedure() {
    let seen_by_procedure: Arc<Mutex<Option<String>>> = Arc::default();
    let reported: Arc<Mutex<Vec<(Option<String>, String)>>> = Arc::default();

    let routes = RouteTable::new([RouteDefinition::get("/slow", "slow").build().unwrap()]).unwrap();
    let mut registry: ProcedureRegistry<()> = ProcedureRegistry::new();
    let seen = Arc::clone(&seen_by_procedure);
    registry.register_raw("slow", move |ctx, _input: Value| {
        let seen = Arc::clone(&seen);
        async move {
            *seen.lock().unwrap() = Some(ctx.request_id().to_string());
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    });
    let sink = Arc::clone(&reported);
    let handler = OpenApiHandler::builder()
        .routes(routes)
        .registry(registry)
        .on_error(move |report| {
            sink.lock().unwrap().push((
                report.procedure_id.map(str::to_string),
                report.request.request_id().to_string(),
            ));
        })
        .build()
        .unwrap();
    let config = ServerConfig::builder()
        .request_timeout(Some(Duration::from_millis(50)))
        .build();
    let server = Server::new(config, handler);

    let request = Request::get("/slow")
        .header(REQUEST_ID_HEADER, "not-a-uuid")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = server.handle_request(request).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let echoed = response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
    assert_ne!(echoed, "not-a-uuid");
    assert_eq!(seen_by_procedure.lock().unwrap().as_deref(), Some(echoed.as_str()));
    assert_eq!(
        *reported.lock().unwrap(),
        vec![(Some("slow".to_string()), echoed)]
    );
}

#[tokio::test]
async fn test_fast_procedure_beats_timeout() {
    let config = ServerConfig::builder()
        .request_timeout(Some(Duration::from_secs(5)))
        .build();
    let (server, _) = server(config);

    let response = server.handle_request(get("/users/2")).await;

    assert_eq!(response.status(), StatusCode::OK);
}

async fn send(addr: std::net::SocketAddr, request: Request<Full<Bytes>>) -> (StatusCode, Value) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(conn);

    let response = sender.send_request(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_serves_over_tcp_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig::builder()
        .base_path("/api")
        .shutdown_timeout(Duration::from_secs(1))
        .build();
    let (server, _) = server(config);

    let shutdown = ShutdownSignal::new();
    let running = tokio::spawn(server.serve(listener, shutdown.clone()));

    let request = Request::post("/api/echo")
        .header("host", addr.to_string())
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from_static(br#"{"message":"hi"}"#)))
        .unwrap();
    let (status, body) = send(addr, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "hi"}));

    let request = Request::get("/api/missing")
        .header("host", addr.to_string())
        .body(Full::new(Bytes::new()))
        .unwrap();
    let (status, body) = send(addr, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_invalid_procedure_error_still_answers_over_tcp() {
    let routes = RouteTable::new([RouteDefinition::get("/fail", "fail").build().unwrap()]).unwrap();
    let mut registry: ProcedureRegistry<()> = ProcedureRegistry::new();
    registry.register_raw("fail", |_ctx, _input: Value| async move {
        Err(ProcedureError::forbidden("Not yours"))
    });
    let handler = OpenApiHandler::builder()
        .routes(routes)
        .registry(registry)
        .build()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let running = tokio::spawn(Server::new(ServerConfig::default(), handler).serve(listener, shutdown.clone()));

    let request = Request::get("/fail")
        .header("host", addr.to_string())
        .body(Full::new(Bytes::new()))
        .unwrap();
    let (status, body) = send(addr, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"message": "Not yours", "code": "FORBIDDEN"}));

    shutdown.trigger();
    running.await.unwrap().unwrap();
}
