//! HTTP-mode invocations against a mock customer service.

mod common;

use common::{gateway_config, start_customer_service, start_raw_backend};
use rest_gateway::failure::{ErrorCategory, TransportKind};
use rest_gateway::headers::names;
use rest_gateway::{Body, Exchange, Message, ProducerError, RestProducer};
use serde_json::{json, Value};
use std::sync::Arc;

fn get(path: &str) -> Message {
    Message::new()
        .with_header(names::HTTP_METHOD, "GET")
        .with_header(names::HTTP_PATH, path)
}

#[tokio::test]
async fn test_get_customer_as_json() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let mut exchange = Exchange::new(get("/customers/123").with_header(names::RESPONSE_CLASS, "json"));
    producer.invoke(&mut exchange).await.unwrap();

    let out = exchange.out_message().unwrap();
    assert_eq!(out.body.as_json().unwrap()["id"], json!(123));
    assert_eq!(out.headers.get(names::HTTP_RESPONSE_CODE), Some(&json!(200)));
    assert_eq!(out.headers.get_string(names::HTTP_RESPONSE_TEXT).as_deref(), Some("OK"));
    assert!(out.headers.get_string("Content-Type").unwrap().starts_with("application/json"));
    assert_eq!(exchange.charset(), Some("UTF-8"));
}

#[tokio::test]
async fn test_default_body_is_response_envelope() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let mut exchange = Exchange::new(get("/customers/124"));
    producer.invoke(&mut exchange).await.unwrap();

    let envelope = exchange.out_message().unwrap().body.as_response().unwrap().clone();
    assert_eq!(envelope.status().as_u16(), 200);
    assert_eq!(envelope.reason(), "OK");
    let customer: Value = serde_json::from_slice(envelope.body()).unwrap();
    assert_eq!(customer["name"], "Mary");
}

#[tokio::test]
async fn test_path_variable_substitution() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let message = get("/customers/{id}")
        .with_header(names::VAR_VALUES, json!(["123"]))
        .with_header(names::RESPONSE_CLASS, "json");
    let mut exchange = Exchange::new(message);
    producer.invoke(&mut exchange).await.unwrap();
    assert_eq!(exchange.out_message().unwrap().body.as_json().unwrap()["id"], json!(123));

    let mut exchange = Exchange::new(get("/customers/{id}"));
    let err = producer.invoke(&mut exchange).await.unwrap_err();
    assert!(matches!(err, ProducerError::UnresolvedPathVariable { .. }));
}

#[tokio::test]
async fn test_post_created_is_success() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let message = Message::new()
        .with_header(names::HTTP_METHOD, "POST")
        .with_header(names::HTTP_PATH, "/customers")
        .with_header(names::RESPONSE_CLASS, "json")
        .with_body(json!({"name": "Ada"}));
    let mut exchange = Exchange::new(message);
    producer.invoke(&mut exchange).await.unwrap();

    let out = exchange.out_message().unwrap();
    assert_eq!(out.headers.get(names::HTTP_RESPONSE_CODE), Some(&json!(201)));
    assert_eq!(out.body.as_json(), Some(&json!({"id": 125, "name": "Ada"})));
}

#[tokio::test]
async fn test_put_malformed_entity_is_operation_failure() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let message = Message::new()
        .with_header(names::HTTP_METHOD, "PUT")
        .with_header(names::HTTP_PATH, "/customers")
        .with_body(json!({"id": 123, "name": ""}));
    let mut exchange = Exchange::new(message);
    let err = producer.invoke(&mut exchange).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Protocol);
    let failure = err.operation_failure().unwrap();
    assert_eq!(failure.status_code(), 422);
    assert_eq!(failure.response_body(), Some("name is required"));
    assert_eq!(failure.uri(), format!("{}/customers", service.base_url()));
    assert!(exchange.out_message().is_none());
}

#[tokio::test]
async fn test_not_found_is_operation_failure() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let mut exchange = Exchange::new(get("/customers/999"));
    let err = producer.invoke(&mut exchange).await.unwrap_err();
    let failure = err.operation_failure().unwrap();
    assert_eq!(failure.status_code(), 404);
    assert_eq!(failure.status_text(), "Not Found");
    assert_eq!(failure.response_body(), Some("Customer not found"));
}

#[tokio::test]
async fn test_suppressed_failure_is_delivered() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let message = get("/notacceptable")
        .with_header(names::THROW_EXCEPTION_ON_FAILURE, false)
        .with_header(names::RESPONSE_CLASS, "json");
    let mut exchange = Exchange::new(message);
    producer.invoke(&mut exchange).await.unwrap();

    let out = exchange.out_message().unwrap();
    assert_eq!(out.headers.get(names::HTTP_RESPONSE_CODE), Some(&json!(406)));
    let envelope = out.body.as_response().unwrap();
    assert_eq!(envelope.status().as_u16(), 406);
    assert_eq!(envelope.text().unwrap(), "not acceptable");
}

#[tokio::test]
async fn test_endpoint_suppression_setting() {
    let service = start_customer_service().await;
    let mut config = gateway_config(&service.base_url());
    config.endpoint.throw_exception_on_failure = false;
    let producer = RestProducer::new(config).unwrap();

    let mut exchange = Exchange::new(get("/customers/999"));
    producer.invoke(&mut exchange).await.unwrap();
    assert_eq!(
        exchange.out_message().unwrap().headers.get(names::HTTP_RESPONSE_CODE),
        Some(&json!(404))
    );

    // The header wins over the endpoint setting.
    let mut exchange = Exchange::new(get("/customers/999").with_header(names::THROW_EXCEPTION_ON_FAILURE, true));
    assert!(producer.invoke(&mut exchange).await.is_err());
}

#[tokio::test]
async fn test_query_map_overrides_embedded_query() {
    let service = start_customer_service().await;
    let address = format!("{}/testQuery?q1=12&q2=13", service.base_url());
    let producer = RestProducer::new(gateway_config(&address)).unwrap();

    let mut exchange = Exchange::new(
        Message::new()
            .with_header(names::HTTP_METHOD, "GET")
            .with_header(names::QUERY_MAP, json!({"q1": "new", "q2": "world"}))
            .with_header(names::RESPONSE_CLASS, "string"),
    );
    producer.invoke(&mut exchange).await.unwrap();
    assert_eq!(exchange.out_message().unwrap().body.as_text(), Some("q1=new&q2=world"));

    let mut exchange = Exchange::new(
        Message::new()
            .with_header(names::HTTP_METHOD, "GET")
            .with_header(names::RESPONSE_CLASS, "string"),
    );
    producer.invoke(&mut exchange).await.unwrap();
    assert_eq!(exchange.out_message().unwrap().body.as_text(), Some("q1=12&q2=13"));
}

#[tokio::test]
async fn test_query_string_header_and_defaults() {
    let service = start_customer_service().await;
    let mut config = gateway_config(&service.base_url());
    config.endpoint.parameters.insert("lang".to_string(), "en".to_string());
    let producer = RestProducer::new(config).unwrap();

    let mut exchange = Exchange::new(get("/testQuery").with_header(names::RESPONSE_CLASS, "string"));
    producer.invoke(&mut exchange).await.unwrap();
    assert_eq!(exchange.out_message().unwrap().body.as_text(), Some("lang=en"));

    let mut exchange = Exchange::new(get("/testQuery?q=1").with_header(names::RESPONSE_CLASS, "string"));
    producer.invoke(&mut exchange).await.unwrap();
    assert_eq!(exchange.out_message().unwrap().body.as_text(), Some("q=1&lang=en"));

    let mut exchange = Exchange::new(
        get("/testQuery")
            .with_header(names::HTTP_QUERY, "a=1&b=2")
            .with_header(names::RESPONSE_CLASS, "string"),
    );
    producer.invoke(&mut exchange).await.unwrap();
    assert_eq!(exchange.out_message().unwrap().body.as_text(), Some("a=1&b=2"));
}

#[tokio::test]
async fn test_control_headers_never_reach_the_wire() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let message = get("/headers")
        .with_header(names::RESPONSE_CLASS, "json")
        .with_header(names::SESSION_SCOPE, "none")
        .with_header("X-Customer-Tier", "gold")
        .with_header("X-Retry", 2);
    let mut exchange = Exchange::new(message);
    producer.invoke(&mut exchange).await.unwrap();

    let out = exchange.out_message().unwrap();
    let seen = out.body.as_json().unwrap().as_object().unwrap();
    assert!(seen.keys().all(|k| !k.starts_with("gateway")));
    assert_eq!(seen["x-customer-tier"], "gold");
    assert_eq!(seen["x-retry"], "2");

    // Inbound headers are carried over to the out message.
    assert_eq!(out.headers.get_string("X-Customer-Tier").as_deref(), Some("gold"));
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let mut exchange = Exchange::new(get("/redirect"));
    let err = producer.invoke(&mut exchange).await.unwrap_err();
    let failure = err.operation_failure().unwrap();
    assert!(failure.is_redirect());
    assert_eq!(failure.redirect_location(), Some("/customerservice/customers/123"));
}

#[tokio::test]
async fn test_transport_failure() {
    let producer = RestProducer::new(gateway_config("http://127.0.0.1:1/customerservice")).unwrap();

    let mut exchange = Exchange::new(get("/customers/123"));
    let err = producer.invoke(&mut exchange).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transport);
    let ProducerError::Transport { kind, uri, .. } = &err else {
        panic!("expected transport failure, got {err}");
    };
    assert_eq!(*kind, TransportKind::Connect);
    assert_eq!(uri, "http://127.0.0.1:1/customerservice/customers/123");
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn test_configuration_errors_never_reach_network() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let mut exchange = Exchange::new(Message::new().with_header(names::HTTP_PATH, "/customers/123"));
    let err = producer.invoke(&mut exchange).await.unwrap_err();
    assert!(matches!(err, ProducerError::MissingHttpMethod(_)));

    let mut exchange = Exchange::new(get("/customers/123").with_header(names::HTTP_QUERY, "broken"));
    let err = producer.invoke(&mut exchange).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);

    let mut exchange =
        Exchange::new(get("/customers/123").with_header(names::DESTINATION_OVERRIDE_URL, "not a url"));
    let err = producer.invoke(&mut exchange).await.unwrap_err();
    assert!(matches!(err, ProducerError::InvalidAddress { .. }));

    assert_eq!(service.hits(), 0);
}

#[tokio::test]
async fn test_in_only_exchange() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let mut exchange = Exchange::in_only(get("/customers/123"));
    producer.invoke(&mut exchange).await.unwrap();
    assert!(exchange.out_message().is_none());

    let mut exchange = Exchange::in_only(get("/customers/999"));
    assert!(producer.invoke(&mut exchange).await.is_err());
    assert_eq!(service.hits(), 2);
}

#[tokio::test]
async fn test_delete_body_ignored_when_configured() {
    let service = start_customer_service().await;
    let mut config = gateway_config(&service.base_url());
    config.endpoint.ignore_delete_method_message_body = true;
    let producer = RestProducer::new(config).unwrap();

    let message = Message::new()
        .with_header(names::HTTP_METHOD, "DELETE")
        .with_header(names::HTTP_PATH, "/customers/123")
        .with_body(json!({"reason": "duplicate"}));
    let mut exchange = Exchange::new(message);
    producer.invoke(&mut exchange).await.unwrap();
    assert_eq!(
        exchange.out_message().unwrap().headers.get(names::HTTP_RESPONSE_CODE),
        Some(&json!(200))
    );
}

#[tokio::test]
async fn test_declared_charset_becomes_exchange_charset() {
    let mut raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=ISO-8859-1\r\nContent-Length: 4\r\nConnection: close\r\n\r\n".to_vec();
    raw.extend_from_slice(b"caf\xe9");
    let addr = start_raw_backend(raw).await;
    let producer = RestProducer::new(gateway_config(&format!("http://{}/", addr))).unwrap();

    let mut exchange = Exchange::new(
        Message::new()
            .with_header(names::HTTP_METHOD, "GET")
            .with_header(names::RESPONSE_CLASS, "string"),
    );
    producer.invoke(&mut exchange).await.unwrap();
    assert_eq!(exchange.charset(), Some("ISO-8859-1"));
    assert_eq!(exchange.out_message().unwrap().body.as_text(), Some("café"));
}

#[tokio::test]
async fn test_utf16_body_decoded_with_declared_charset() {
    let mut raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=UTF-16LE\r\nContent-Length: 6\r\nConnection: close\r\n\r\n".to_vec();
    raw.extend_from_slice(b"h\0i\0!\0");
    let addr = start_raw_backend(raw).await;
    let producer = RestProducer::new(gateway_config(&format!("http://{}/", addr))).unwrap();

    let mut exchange = Exchange::new(
        Message::new()
            .with_header(names::HTTP_METHOD, "GET")
            .with_header(names::RESPONSE_CLASS, "string"),
    );
    producer.invoke(&mut exchange).await.unwrap();
    assert_eq!(exchange.charset(), Some("UTF-16LE"));
    assert_eq!(exchange.out_message().unwrap().body.as_text(), Some("hi!"));
}

#[tokio::test]
async fn test_address_override_isolated_per_call() {
    let primary = start_customer_service().await;
    let secondary = start_customer_service().await;
    let producer = Arc::new(RestProducer::new(gateway_config(&primary.base_url())).unwrap());

    let overridden = {
        let producer = producer.clone();
        let address = secondary.base_url();
        tokio::spawn(async move {
            let mut exchange =
                Exchange::new(get("/customers/123").with_header(names::DESTINATION_OVERRIDE_URL, address));
            producer.invoke(&mut exchange).await.map(|_| exchange)
        })
    };
    let default = {
        let producer = producer.clone();
        tokio::spawn(async move {
            let mut exchange = Exchange::new(get("/customers/124"));
            producer.invoke(&mut exchange).await.map(|_| exchange)
        })
    };

    overridden.await.unwrap().unwrap();
    default.await.unwrap().unwrap();

    assert_eq!(primary.hits(), 1);
    assert_eq!(secondary.hits(), 1);
    assert_eq!(producer.cache().len(), 2);
    assert_eq!(
        producer.default_client_config().address().as_str(),
        primary.base_url()
    );

    // A later call without the header goes back to the default address.
    let mut exchange = Exchange::new(get("/customers/123"));
    producer.invoke(&mut exchange).await.unwrap();
    assert_eq!(primary.hits(), 2);
}

#[tokio::test]
async fn test_bytes_and_void_response_types() {
    let service = start_customer_service().await;
    let producer = RestProducer::new(gateway_config(&service.base_url())).unwrap();

    let mut exchange = Exchange::new(get("/customers/123").with_header(names::RESPONSE_CLASS, "bytes"));
    producer.invoke(&mut exchange).await.unwrap();
    let Body::Bytes(bytes) = &exchange.out_message().unwrap().body else {
        panic!("expected bytes body");
    };
    assert!(bytes.starts_with(b"{"));

    let mut exchange = Exchange::new(get("/customers/123").with_header(names::RESPONSE_CLASS, "void"));
    producer.invoke(&mut exchange).await.unwrap();
    assert!(exchange.out_message().unwrap().body.is_empty());
}
