//! Wire request construction for both invocation modes.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use crate::client::resource::{ParamBinding, ResourceDescriptor};
use crate::exchange::message::value_to_string;
use crate::exchange::{Body, Message};
use crate::failure::{classify, ProducerError, ProducerResult};
use crate::headers::uri::{join_path, substitute_named, substitute_positional};
use crate::headers::{names, HeaderTranslator, QueryPlan};
use crate::invocation::mode::{parse_method, Invocation};
use crate::producer::ResponseType;

/// Outbound entity and its derived content type.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Endpoint-level settings that shape every request.
#[derive(Debug, Clone, Copy)]
pub struct RequestDefaults<'a> {
    pub query: &'a BTreeMap<String, String>,
    pub ignore_delete_body: bool,
    pub charset: &'a str,
}

/// Everything needed to issue one call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub response_type: ResponseType,
    /// Operation name in proxy mode.
    pub operation: Option<String>,
}

impl RequestContext {
    /// Build the context for a resolved invocation.
    pub fn build(
        invocation: Invocation,
        message: &Message,
        address: &Url,
        resource: Option<&ResourceDescriptor>,
        translator: &HeaderTranslator,
        defaults: RequestDefaults<'_>,
    ) -> ProducerResult<Self> {
        match invocation {
            Invocation::Http {
                method,
                path,
                query,
                substitutions,
                response_type,
            } => Self::for_http(
                method,
                path.as_deref(),
                &query,
                &substitutions,
                response_type,
                message,
                address,
                translator,
                defaults,
            ),
            Invocation::Proxy {
                operation,
                params,
                class_values,
            } => {
                let resource = resource.ok_or(ProducerError::MissingResource)?;
                Self::for_proxy(
                    &operation,
                    &params,
                    &class_values,
                    resource,
                    message,
                    address,
                    translator,
                    defaults,
                )
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn for_http(
        method: Method,
        path: Option<&str>,
        query: &QueryPlan,
        substitutions: &[String],
        response_type: ResponseType,
        message: &Message,
        address: &Url,
        translator: &HeaderTranslator,
        defaults: RequestDefaults<'_>,
    ) -> ProducerResult<Self> {
        let mut url = match path {
            Some(template) => join_path(address, &substitute_positional(template, substitutions)?),
            None => address.clone(),
        };
        query.apply(&mut url, defaults.query);

        let mut headers = translator.to_request_headers(&message.headers);
        let body = if carries_body(&method, defaults.ignore_delete_body) {
            encode_body(&message.body, defaults.charset)
        } else {
            None
        };
        set_content_type(&mut headers, body.as_ref());

        Ok(Self {
            method,
            url,
            headers,
            body,
            response_type,
            operation: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn for_proxy(
        operation: &str,
        params: &[Value],
        class_values: &[String],
        resource: &ResourceDescriptor,
        message: &Message,
        address: &Url,
        translator: &HeaderTranslator,
        defaults: RequestDefaults<'_>,
    ) -> ProducerResult<Self> {
        let op = resource
            .find_operation(operation, params.len())
            .ok_or_else(|| ProducerError::UnknownOperation {
                resource: resource.name.clone(),
                name: operation.to_string(),
                arity: params.len(),
            })?;
        let method = parse_method(&op.method)?;

        let mut path_values = BTreeMap::new();
        let mut query_pairs = Vec::new();
        let mut header_values = Vec::new();
        let mut entity = None;
        for (binding, value) in op.params.iter().zip(params) {
            match binding {
                ParamBinding::Path(name) => {
                    path_values.insert(name.clone(), value_to_string(value).unwrap_or_default());
                }
                ParamBinding::Query(name) => {
                    if let Some(v) = value_to_string(value) {
                        query_pairs.push((name.clone(), v));
                    }
                }
                ParamBinding::Header(name) => {
                    if let Some(v) = value_to_string(value) {
                        header_values.push((name.clone(), v));
                    }
                }
                ParamBinding::Body => entity = Some(value),
            }
        }

        let class_path = substitute_positional(&resource.path, class_values)?;
        let op_path = substitute_named(&op.path, &path_values)?;
        let mut url = join_path(&join_path(address, &class_path), &op_path);
        if query_pairs.is_empty() {
            QueryPlan::Embedded.apply(&mut url, defaults.query);
        } else {
            url.query_pairs_mut().extend_pairs(&query_pairs);
        }

        let mut headers = translator.to_request_headers(&message.headers);
        for (name, value) in header_values {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ProducerError::invalid_header(&name, e.to_string()))?;
            let header_value =
                HeaderValue::from_str(&value).map_err(|e| ProducerError::invalid_header(&name, e.to_string()))?;
            headers.insert(header_name, header_value);
        }
        if let Some(produces) = &op.produces {
            if !headers.contains_key(ACCEPT) {
                if let Ok(accept) = HeaderValue::from_str(produces) {
                    headers.insert(ACCEPT, accept);
                }
            }
        }

        let body = match entity {
            Some(value) if carries_body(&method, defaults.ignore_delete_body) => {
                Some(encode_entity(value, op.consumes.as_deref()))
            }
            _ => None,
        };
        set_content_type(&mut headers, body.as_ref());

        Ok(Self {
            method,
            url,
            headers,
            body,
            response_type: ResponseType::from_headers(&message.headers, op.returns)?,
            operation: Some(op.name.clone()),
        })
    }

    /// Turn the context into a request on `client`.
    pub fn into_request(self, client: &reqwest::Client) -> ProducerResult<reqwest::Request> {
        let uri = self.url.clone();
        let mut builder = client.request(self.method, self.url).headers(self.headers);
        if let Some(body) = self.body {
            builder = builder.body(body.bytes);
        }
        builder.build().map_err(|e| classify::transport(&uri, e))
    }
}

fn carries_body(method: &Method, ignore_delete_body: bool) -> bool {
    if *method == Method::GET || *method == Method::HEAD {
        return false;
    }
    !(*method == Method::DELETE && ignore_delete_body)
}

fn encode_body(body: &Body, charset: &str) -> Option<RequestBody> {
    let (bytes, content_type) = match body {
        Body::Empty => return None,
        Body::Bytes(bytes) => (bytes.clone(), "application/octet-stream".to_string()),
        Body::Text(text) => (
            Bytes::from(text.clone()),
            format!("text/plain; charset={}", charset),
        ),
        Body::Json(value) => (Bytes::from(value.to_string()), "application/json".to_string()),
        Body::Response(envelope) => (
            envelope.body().clone(),
            envelope
                .header(names::CONTENT_TYPE)
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        ),
    };
    Some(RequestBody { bytes, content_type })
}

/// Text media types carry string parameters verbatim; everything else is JSON.
fn encode_entity(value: &Value, consumes: Option<&str>) -> RequestBody {
    let content_type = consumes.unwrap_or("application/json").to_string();
    let bytes = match value {
        Value::String(s) if content_type.starts_with("text/") => Bytes::from(s.clone()),
        other => Bytes::from(other.to_string()),
    };
    RequestBody { bytes, content_type }
}

fn set_content_type(headers: &mut HeaderMap, body: Option<&RequestBody>) {
    let Some(body) = body else {
        return;
    };
    if headers.contains_key(CONTENT_TYPE) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&body.content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::resource::OperationDescriptor;
    use crate::config::HeaderFilterConfig;
    use serde_json::json;

    fn translator() -> HeaderTranslator {
        HeaderTranslator::from_config(&HeaderFilterConfig::default(), "UTF-8")
    }

    fn address() -> Url {
        Url::parse("http://localhost:9000/customerservice").unwrap()
    }

    fn defaults(query: &BTreeMap<String, String>) -> RequestDefaults<'_> {
        RequestDefaults {
            query,
            ignore_delete_body: false,
            charset: "UTF-8",
        }
    }

    fn resource() -> ResourceDescriptor {
        ResourceDescriptor::new("CustomerService", "")
            .with_operation(
                OperationDescriptor::new("getCustomer", "GET", "/customers/{id}")
                    .param(ParamBinding::Path("id".into()))
                    .produces("application/json"),
            )
            .with_operation(
                OperationDescriptor::new("updateCustomer", "PUT", "/customers")
                    .param(ParamBinding::Body)
                    .param(ParamBinding::Header("X-Request-Id".into())),
            )
            .with_operation(
                OperationDescriptor::new("findCustomers", "GET", "/customers")
                    .param(ParamBinding::Query("name".into())),
            )
    }

    fn build(message: &Message, default_http: bool) -> ProducerResult<RequestContext> {
        let invocation = Invocation::resolve(message, default_http)?;
        let resource = resource();
        let query = BTreeMap::new();
        RequestContext::build(invocation, message, &address(), Some(&resource), &translator(), defaults(&query))
    }

    #[test]
    fn test_http_get_drops_body() {
        let message = Message::new()
            .with_header(names::HTTP_METHOD, "GET")
            .with_header(names::HTTP_PATH, "/customers/{id}")
            .with_header(names::VAR_VALUES, json!(["123"]))
            .with_body(json!({"ignored": true}));
        let ctx = build(&message, true).unwrap();
        assert_eq!(ctx.url.as_str(), "http://localhost:9000/customerservice/customers/123");
        assert!(ctx.body.is_none());
        assert!(ctx.headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_http_post_derives_content_type() {
        let message = Message::new()
            .with_header(names::HTTP_METHOD, "POST")
            .with_header(names::HTTP_PATH, "/customers")
            .with_body(json!({"name": "Mary"}));
        let ctx = build(&message, true).unwrap();
        assert_eq!(ctx.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(ctx.body.unwrap().bytes.as_ref(), br#"{"name":"Mary"}"#);

        let message = Message::new()
            .with_header(names::HTTP_METHOD, "POST")
            .with_header("Content-Type", "application/xml")
            .with_body("<customer/>");
        let ctx = build(&message, true).unwrap();
        assert_eq!(ctx.headers.get(CONTENT_TYPE).unwrap(), "application/xml");
    }

    #[test]
    fn test_delete_body_dropped_when_configured() {
        let message = Message::new()
            .with_header(names::HTTP_METHOD, "DELETE")
            .with_body("payload");
        let invocation = Invocation::resolve(&message, true).unwrap();
        let query = BTreeMap::new();
        let ctx = RequestContext::build(
            invocation,
            &message,
            &address(),
            None,
            &translator(),
            RequestDefaults {
                query: &query,
                ignore_delete_body: true,
                charset: "UTF-8",
            },
        )
        .unwrap();
        assert!(ctx.body.is_none());
    }

    #[test]
    fn test_endpoint_default_query() {
        let mut query = BTreeMap::new();
        query.insert("lang".to_string(), "en".to_string());
        let message = Message::new().with_header(names::HTTP_METHOD, "GET");
        let invocation = Invocation::resolve(&message, true).unwrap();
        let ctx =
            RequestContext::build(invocation, &message, &address(), None, &translator(), defaults(&query)).unwrap();
        assert_eq!(ctx.url.query(), Some("lang=en"));
    }

    #[test]
    fn test_proxy_get_customer() {
        let message = Message::new()
            .with_header(names::OPERATION_NAME, "getCustomer")
            .with_body("123");
        let ctx = build(&message, false).unwrap();
        assert_eq!(ctx.method, Method::GET);
        assert_eq!(ctx.url.as_str(), "http://localhost:9000/customerservice/customers/123");
        assert_eq!(ctx.headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(ctx.response_type, ResponseType::Json);
        assert_eq!(ctx.operation.as_deref(), Some("getCustomer"));
    }

    #[test]
    fn test_proxy_body_and_header_params() {
        let message = Message::new()
            .with_header(names::OPERATION_NAME, "updateCustomer")
            .with_body(json!([{"id": 123, "name": ""}, "req-1"]));
        let ctx = build(&message, false).unwrap();
        assert_eq!(ctx.method, Method::PUT);
        assert_eq!(ctx.headers.get("x-request-id").unwrap(), "req-1");
        assert_eq!(ctx.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(ctx.body.unwrap().bytes.as_ref(), br#"{"id":123,"name":""}"#);
    }

    #[test]
    fn test_proxy_query_param() {
        let message = Message::new()
            .with_header(names::OPERATION_NAME, "findCustomers")
            .with_body("Mary Smith");
        let ctx = build(&message, false).unwrap();
        assert_eq!(ctx.url.query(), Some("name=Mary+Smith"));
    }

    #[test]
    fn test_proxy_unknown_operation_or_arity() {
        let message = Message::new()
            .with_header(names::OPERATION_NAME, "getCustomer")
            .with_body(json!(["1", "2"]));
        let err = build(&message, false).unwrap_err();
        assert!(matches!(err, ProducerError::UnknownOperation { arity: 2, .. }));
    }

    #[test]
    fn test_proxy_requires_resource() {
        let message = Message::new().with_header(names::OPERATION_NAME, "getCustomer");
        let invocation = Invocation::resolve(&message, false).unwrap();
        let query = BTreeMap::new();
        let err = RequestContext::build(invocation, &message, &address(), None, &translator(), defaults(&query))
            .unwrap_err();
        assert!(matches!(err, ProducerError::MissingResource));
    }
}
