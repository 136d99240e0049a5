//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::extract::{Path, RawQuery, Request};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use rest_gateway::client::{OperationDescriptor, ParamBinding, ResourceDescriptor};
use rest_gateway::producer::ResponseType;
use rest_gateway::GatewayConfig;

/// A running mock customer service.
pub struct MockService {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockService {
    /// Base address of the customer service resource.
    pub fn base_url(&self) -> String {
        format!("http://{}/customerservice", self.addr)
    }

    /// Number of requests the service has received.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start the mock customer service on an ephemeral port.
pub async fn start_customer_service() -> MockService {
    let hits = Arc::new(AtomicUsize::new(0));
    let sessions = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    let login_sessions = sessions.clone();
    let fail_sessions = sessions;

    let app = Router::new()
        .route("/customerservice/customers", get(list_customers).post(add_customer).put(update_customer))
        .route("/customerservice/customers/{id}", get(get_customer).delete(delete_customer))
        .route("/customerservice/testQuery", get(echo_query))
        .route("/customerservice/headers", get(echo_headers))
        .route("/customerservice/notacceptable", get(not_acceptable))
        .route("/customerservice/redirect", get(redirect))
        .route(
            "/customerservice/session/login",
            get(move || {
                let n = login_sessions.fetch_add(1, Ordering::SeqCst) + 1;
                async move { session_response(StatusCode::OK, n, "logged in") }
            }),
        )
        .route(
            "/customerservice/session/fail",
            get(move || {
                let n = fail_sessions.fetch_add(1, Ordering::SeqCst) + 1;
                async move { session_response(StatusCode::INTERNAL_SERVER_ERROR, n, "boom") }
            }),
        )
        .route("/customerservice/session/whoami", get(whoami))
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                next.run(req).await
            }
        }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockService { addr, hits }
}

async fn get_customer(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "123" => Json(json!({"id": 123, "name": "John"})).into_response(),
        "124" => Json(json!({"id": 124, "name": "Mary"})).into_response(),
        _ => (StatusCode::NOT_FOUND, "Customer not found").into_response(),
    }
}

async fn list_customers(RawQuery(query): RawQuery) -> Response {
    let customers = json!([{"id": 123, "name": "John"}, {"id": 124, "name": "Mary"}]);
    match query {
        Some(q) if q.contains("name=") => {
            let name = q.trim_start_matches("name=").replace('+', " ");
            let matching: Vec<Value> = customers
                .as_array()
                .into_iter()
                .flatten()
                .filter(|c| c["name"] == name.as_str())
                .cloned()
                .collect();
            Json(Value::Array(matching)).into_response()
        }
        _ => Json(customers).into_response(),
    }
}

async fn add_customer(Json(mut customer): Json<Value>) -> Response {
    customer["id"] = json!(125);
    (StatusCode::CREATED, Json(customer)).into_response()
}

async fn update_customer(Json(customer): Json<Value>) -> Response {
    match customer.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => Json(customer).into_response(),
        _ => (StatusCode::UNPROCESSABLE_ENTITY, "name is required").into_response(),
    }
}

async fn delete_customer(Path(id): Path<String>) -> Response {
    if id == "123" {
        StatusCode::OK.into_response()
    } else {
        (StatusCode::NOT_FOUND, "Customer not found").into_response()
    }
}

async fn echo_query(RawQuery(query): RawQuery) -> String {
    query.unwrap_or_default()
}

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let mut map = serde_json::Map::new();
    for (name, value) in headers.iter() {
        map.insert(name.as_str().to_string(), json!(value.to_str().unwrap_or_default()));
    }
    Json(Value::Object(map))
}

async fn not_acceptable() -> Response {
    (StatusCode::NOT_ACCEPTABLE, "not acceptable").into_response()
}

async fn redirect() -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, "/customerservice/customers/123")],
    )
        .into_response()
}

fn session_response(status: StatusCode, session: usize, body: &'static str) -> Response {
    (
        status,
        [(header::SET_COOKIE, format!("SESSIONID=s{}; Path=/", session))],
        body,
    )
        .into_response()
}

async fn whoami(headers: HeaderMap) -> String {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Start a mock backend that answers every connection with the same raw
/// HTTP response bytes.
pub async fn start_raw_backend(response: Vec<u8>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = Arc::new(response);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let response = response.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let _ = socket.write_all(&response).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Gateway config pointing at `address` in HTTP mode.
pub fn gateway_config(address: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.endpoint.address = address.to_string();
    config
}

/// Gateway config pointing at `address` in proxy mode with the customer
/// resource.
pub fn proxy_config(address: &str) -> GatewayConfig {
    let mut config = gateway_config(address);
    config.endpoint.http_client_api = false;
    config.resource = Some(customer_resource());
    config
}

/// The customer service resource as seen from the gateway.
pub fn customer_resource() -> ResourceDescriptor {
    ResourceDescriptor::new("CustomerService", "")
        .with_operation(
            OperationDescriptor::new("getCustomer", "GET", "/customers/{id}")
                .param(ParamBinding::Path("id".into()))
                .produces("application/json"),
        )
        .with_operation(
            OperationDescriptor::new("getCustomers", "GET", "/customers").returns(ResponseType::Response),
        )
        .with_operation(
            OperationDescriptor::new("findCustomers", "GET", "/customers")
                .param(ParamBinding::Query("name".into())),
        )
        .with_operation(OperationDescriptor::new("addCustomer", "POST", "/customers").param(ParamBinding::Body))
        .with_operation(
            OperationDescriptor::new("updateCustomer", "PUT", "/customers")
                .param(ParamBinding::Body)
                .returns(ResponseType::Response),
        )
        .with_operation(
            OperationDescriptor::new("deleteCustomer", "DELETE", "/customers/{id}")
                .param(ParamBinding::Path("id".into()))
                .returns(ResponseType::Void),
        )
}
