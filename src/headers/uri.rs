//! Request URI shaping: path joining, placeholder substitution, query plans.

use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use crate::exchange::message::value_to_string;
use crate::exchange::Headers;
use crate::failure::{ProducerError, ProducerResult};
use crate::headers::names;

/// Where the query string of a request comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Replace any embedded query with these pairs.
    Override(Vec<(String, String)>),
    /// Keep the embedded query verbatim and append the endpoint defaults.
    Embedded,
}

impl QueryPlan {
    /// Resolve the plan from the query-map and raw query-string headers.
    ///
    /// The map wins over the raw string.
    pub fn from_headers(headers: &Headers) -> ProducerResult<Self> {
        if let Some(map) = headers.get(names::QUERY_MAP).filter(|v| !v.is_null()) {
            return query_pairs_from_map(map).map(QueryPlan::Override);
        }
        if let Some(query) = headers.get_string(names::HTTP_QUERY) {
            return parse_query_string(&query).map(QueryPlan::Override);
        }
        Ok(QueryPlan::Embedded)
    }

    /// Apply the plan to a URL that already carries any embedded query.
    pub fn apply(&self, url: &mut Url, defaults: &BTreeMap<String, String>) {
        match self {
            QueryPlan::Override(pairs) => {
                url.set_query(None);
                if !pairs.is_empty() {
                    url.query_pairs_mut().extend_pairs(pairs);
                }
            }
            QueryPlan::Embedded => {
                if !defaults.is_empty() {
                    url.query_pairs_mut().extend_pairs(defaults);
                }
            }
        }
    }
}

fn query_pairs_from_map(map: &Value) -> ProducerResult<Vec<(String, String)>> {
    let Value::Object(entries) = map else {
        return Err(ProducerError::invalid_header(names::QUERY_MAP, "expected a map of query parameters"));
    };
    Ok(entries
        .iter()
        .filter_map(|(k, v)| value_to_string(v).map(|v| (k.clone(), v)))
        .collect())
}

/// Parse `a=1&b=2` into decoded pairs. Every parameter must be a pair.
pub fn parse_query_string(query: &str) -> ProducerResult<Vec<(String, String)>> {
    let query = query.trim_start_matches('?');
    let mut pairs = Vec::new();
    for param in query.split('&').filter(|p| !p.is_empty()) {
        if !param.contains('=') {
            return Err(ProducerError::invalid_header(
                names::HTTP_QUERY,
                format!("expected a name=value pair but was '{}'", param),
            ));
        }
        pairs.extend(url::form_urlencoded::parse(param.as_bytes()).into_owned());
    }
    Ok(pairs)
}

/// Append a relative path (which may carry its own query) to `base`.
///
/// `http://h/api` + `/customers?x=1` → `http://h/api/customers?x=1`. A query
/// embedded in the relative path is appended to any query of the base.
pub fn join_path(base: &Url, relative: &str) -> Url {
    let mut url = base.clone();
    let (path, query) = match relative.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (relative, None),
    };

    if !path.is_empty() {
        let mut joined = url.path().trim_end_matches('/').to_string();
        if !path.starts_with('/') {
            joined.push('/');
        }
        joined.push_str(path);
        url.set_path(&joined);
    }

    if let Some(extra) = query.filter(|q| !q.is_empty()) {
        let combined = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{}&{}", existing, extra),
            _ => extra.to_string(),
        };
        url.set_query(Some(&combined));
    }
    url
}

/// Substitute `{name}` / `{name:regex}` placeholders positionally.
///
/// Values bind to distinct placeholder names in order of first appearance;
/// repeated names reuse the same value. Surplus values are ignored.
pub fn substitute_positional(template: &str, values: &[String]) -> ProducerResult<String> {
    let mut bound: Vec<(String, String)> = Vec::new();
    let mut remaining = values.iter();
    substitute(template, |name| {
        if let Some((_, v)) = bound.iter().find(|(n, _)| n == name) {
            return Some(v.clone());
        }
        let value = remaining.next()?.clone();
        bound.push((name.to_string(), value.clone()));
        Some(value)
    })
}

/// Substitute placeholders by name.
pub fn substitute_named(
    template: &str,
    values: &BTreeMap<String, String>,
) -> ProducerResult<String> {
    substitute(template, |name| values.get(name).cloned())
}

fn substitute(
    template: &str,
    mut lookup: impl FnMut(&str) -> Option<String>,
) -> ProducerResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        // Regex parts may contain braces, so track nesting depth.
        let mut depth = 1usize;
        let mut end = None;
        for (i, c) in after.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(end) = end else {
            // Unbalanced brace: keep the remainder literally.
            out.push_str(&rest[start..]);
            return Ok(out);
        };

        let inner = &after[..end];
        let name = inner.split(':').next().unwrap_or(inner).trim();
        let value = lookup(name).ok_or_else(|| ProducerError::UnresolvedPathVariable {
            template: template.to_string(),
            name: name.to_string(),
        })?;
        out.push_str(&encode_path_segment(&value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Percent-encode a value so it stays inside a single path segment.
pub fn encode_path_segment(value: &str) -> String {
    let Ok(mut scratch) = Url::parse("http://segment.invalid/") else {
        return value.to_string();
    };
    if let Ok(mut segments) = scratch.path_segments_mut() {
        segments.clear().push(value);
    }
    scratch.path().trim_start_matches('/').to_string()
}
