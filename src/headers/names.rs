//! Control header names.
//!
//! Control headers steer the producer and are never written to the wire.

/// Selects HTTP mode (`true`) or proxy mode (`false`).
pub const USING_HTTP_API: &str = "GatewayUsingHttpApi";
/// Operation to invoke in proxy mode.
pub const OPERATION_NAME: &str = "GatewayOperationName";
/// HTTP verb in HTTP mode.
pub const HTTP_METHOD: &str = "GatewayHttpMethod";
/// Relative path appended to the target address.
pub const HTTP_PATH: &str = "GatewayHttpPath";
/// Raw query string (`a=1&b=2`).
pub const HTTP_QUERY: &str = "GatewayHttpQuery";
/// Query parameter map; overrides any embedded query string.
pub const QUERY_MAP: &str = "GatewayQueryMap";
/// Positional values for `{placeholder}` substitution.
pub const VAR_VALUES: &str = "GatewayVarValues";
/// Requested response body type.
pub const RESPONSE_CLASS: &str = "GatewayResponseClass";
/// Element type for collection responses.
pub const RESPONSE_GENERIC_TYPE: &str = "GatewayResponseGenericType";
/// Per-call target address.
pub const DESTINATION_OVERRIDE_URL: &str = "GatewayDestinationOverrideUrl";
/// Per-call override of the throw-on-failure setting.
pub const THROW_EXCEPTION_ON_FAILURE: &str = "GatewayThrowExceptionOnFailure";
/// Named client features to apply for this call.
pub const FEATURES: &str = "GatewayFeatures";
/// Per-call session scope marker.
pub const SESSION_SCOPE: &str = "GatewaySessionScope";
/// Response status code, set on the outbound message.
pub const HTTP_RESPONSE_CODE: &str = "GatewayHttpResponseCode";
/// Response reason phrase, set on the outbound message.
pub const HTTP_RESPONSE_TEXT: &str = "GatewayHttpResponseText";

pub const CONTENT_TYPE: &str = "Content-Type";

/// Fixed denylist applied before any filter strategy.
pub const CONTROL_HEADERS: &[&str] = &[
    USING_HTTP_API,
    OPERATION_NAME,
    HTTP_METHOD,
    HTTP_PATH,
    HTTP_QUERY,
    QUERY_MAP,
    VAR_VALUES,
    RESPONSE_CLASS,
    RESPONSE_GENERIC_TYPE,
    DESTINATION_OVERRIDE_URL,
    THROW_EXCEPTION_ON_FAILURE,
    FEATURES,
    SESSION_SCOPE,
    HTTP_RESPONSE_CODE,
    HTTP_RESPONSE_TEXT,
];

/// True if `name` is a control header (case-insensitive).
pub fn is_control_header(name: &str) -> bool {
    CONTROL_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
}
