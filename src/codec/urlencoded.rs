//! URL-encoded codec for query-style APIs
//!
//! Requests are linearized to `Action=<op>&Version=<ver>&<Field>=<value>&...`
//! with keys sorted, nested fields joined with `.` and list items numbered
//! from 1 (`InstanceId.1=...`). Responses from these endpoints are XML, so
//! decoding is delegated to [`XmlCodec`].

use super::{Codec, XmlCodec};
use crate::error::{Error, Result, PHASE_BUILD_REQUEST};
use crate::prism::http::{RequestEnvelope, ResponseEnvelope};
use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// URL-encoded request strategy with XML responses
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlEncodedCodec {
    response: XmlCodec,
}

impl UrlEncodedCodec {
    /// Encode `value` as a sorted query string carrying `Action` and `Version`.
    ///
    /// `value` must serialize to a struct/map (or unit). Field names come from
    /// the serde names, so `#[serde(rename = "InstanceId")]` on a `Vec` field
    /// yields `InstanceId.1`, `InstanceId.2`, ... `Action` and `Version` always
    /// win over caller fields of the same name.
    pub fn marshal<T>(value: &T, action: &str, version: &str) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        let value =
            serde_json::to_value(value).map_err(|e| Error::serialization(PHASE_BUILD_REQUEST, e))?;

        let mut fields = BTreeMap::new();
        match value {
            Value::Object(map) => {
                for (key, v) in map {
                    flatten(&key, v, &mut fields);
                }
            }
            Value::Null => {}
            other => {
                return Err(Error::serialization(
                    PHASE_BUILD_REQUEST,
                    format!("url-encoded body must be a struct or map, got {}", kind_of(&other)),
                ))
            }
        }

        fields.insert("Action".to_string(), action.to_string());
        fields.insert("Version".to_string(), version.to_string());

        Ok(fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&"))
    }
}

fn flatten(prefix: &str, value: Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s);
        }
        Value::Array(items) => {
            for (i, item) in items.into_iter().enumerate() {
                flatten(&format!("{}.{}", prefix, i + 1), item, out);
            }
        }
        Value::Object(map) => {
            for (key, v) in map {
                flatten(&format!("{}.{}", prefix, key), v, out);
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Characters `Url::set_query` leaves untouched
fn is_query_safe(c: char) -> bool {
    matches!(c, '!'..='~') && !matches!(c, '"' | '#' | '<' | '>' | '\'')
}

/// Place an already-encoded body on a request.
///
/// POST carries it as the payload, GET appends it verbatim as the query
/// string. Anything else is [`Error::UnsupportedMethod`]. A GET body must
/// already be percent-encoded; characters the URL parser would rewrite are
/// rejected rather than silently changed.
pub fn build_url_encoded_request(method: Method, mut url: Url, body: &str) -> Result<RequestEnvelope> {
    if method == Method::POST {
        return Ok(RequestEnvelope::new(
            method,
            url,
            CONTENT_TYPE,
            Some(Bytes::copy_from_slice(body.as_bytes())),
        ));
    }

    if method == Method::GET {
        if let Some(bad) = body.chars().find(|c| !is_query_safe(*c)) {
            return Err(Error::serialization(
                PHASE_BUILD_REQUEST,
                format!("query string must be percent-encoded, found {:?}", bad),
            ));
        }
        if !body.is_empty() {
            url.set_query(Some(body));
        }
        return Ok(RequestEnvelope::new(method, url, CONTENT_TYPE, None));
    }

    Err(Error::UnsupportedMethod(method))
}

impl Codec for UrlEncodedCodec {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    /// `body` must be the string produced by [`UrlEncodedCodec::marshal`]
    fn build_request<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<RequestEnvelope>
    where
        B: Serialize + ?Sized,
    {
        let encoded = match body {
            Some(body) => match serde_json::to_value(body)
                .map_err(|e| Error::serialization(PHASE_BUILD_REQUEST, e))?
            {
                Value::String(s) => s,
                other => {
                    return Err(Error::serialization(
                        PHASE_BUILD_REQUEST,
                        format!("url-encoded body must be a pre-encoded string, got {}", kind_of(&other)),
                    ))
                }
            },
            None => String::new(),
        };

        build_url_encoded_request(method, url, &encoded)
    }

    fn unmarshal<T: DeserializeOwned>(&self, response: &ResponseEnvelope) -> Result<T> {
        self.response.unmarshal(response)
    }

    fn unmarshal_error(&self, response: &ResponseEnvelope) -> Error {
        self.response.unmarshal_error(response)
    }
}
