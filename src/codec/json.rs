//! JSON codec for the v3 REST API

use super::Codec;
use crate::error::{Error, Result, PHASE_BUILD_REQUEST, PHASE_DECODE_RESPONSE};
use crate::prism::http::{sanitize_for_log, RequestEnvelope, ResponseEnvelope};
use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

const CONTENT_TYPE: &str = "application/json";

/// JSON request/response strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

/// Error payload returned by the v3 API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message_list: Vec<MessageResource>,
    /// Some services answer with a bare message instead of a list
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    #[serde(default)]
    message: String,
    #[serde(default)]
    reason: Option<String>,
}

impl MessageResource {
    fn render(&self) -> String {
        match &self.reason {
            Some(reason) if !reason.is_empty() => format!("{}: {}", reason, self.message),
            _ => self.message.clone(),
        }
    }
}

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    fn build_request<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<RequestEnvelope>
    where
        B: Serialize + ?Sized,
    {
        let body = match body {
            Some(body) => Some(Bytes::from(
                serde_json::to_vec(body).map_err(|e| Error::serialization(PHASE_BUILD_REQUEST, e))?,
            )),
            None => None,
        };

        Ok(RequestEnvelope::new(method, url, CONTENT_TYPE, body))
    }

    fn unmarshal<T: DeserializeOwned>(&self, response: &ResponseEnvelope) -> Result<T> {
        // Empty bodies decode like `null` so `()` and `Option<T>` destinations work
        let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &response.body
        };

        serde_json::from_slice(body).map_err(|e| Error::serialization(PHASE_DECODE_RESPONSE, e))
    }

    fn unmarshal_error(&self, response: &ResponseEnvelope) -> Error {
        let status = response.status;

        let Ok(parsed) = serde_json::from_slice::<ErrorResponse>(&response.body) else {
            // Plain-text or truncated body; keep what we can for diagnosis
            let text = sanitize_for_log(response.text().trim());
            let message = if text.is_empty() {
                response.reason().to_string()
            } else {
                text
            };
            return Error::Http {
                status,
                code: status.to_string(),
                message,
            };
        };

        let code = match parsed.code {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => status.to_string(),
        };

        let message = if !parsed.message_list.is_empty() {
            parsed
                .message_list
                .iter()
                .map(MessageResource::render)
                .collect::<Vec<_>>()
                .join("; ")
        } else {
            parsed
                .message
                .unwrap_or_else(|| response.reason().to_string())
        };

        Error::Http {
            status,
            code,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn url() -> Url {
        Url::parse("https://prism.local:9440/api/nutanix/v3/vms").unwrap()
    }

    #[test]
    fn test_build_request_encodes_body() {
        let req = JsonCodec
            .build_request(Method::POST, url(), Some(&json!({"name": "bar"})))
            .unwrap();
        assert_eq!(req.content_type, "application/json");
        assert_eq!(req.body_text().unwrap(), r#"{"name":"bar"}"#);
    }

    #[test]
    fn test_build_request_without_body() {
        let req = JsonCodec
            .build_request::<Value>(Method::GET, url(), None)
            .unwrap();
        assert!(req.body.is_none());
    }

    #[test]
    fn test_unmarshal_keeps_body_readable() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Foo {
            #[serde(rename = "A")]
            a: String,
        }

        let resp = ResponseEnvelope::new(200, r#"{"A":"a"}"#);
        let foo: Foo = JsonCodec.unmarshal(&resp).unwrap();
        assert_eq!(foo, Foo { a: "a".into() });

        // Second read sees the same payload
        let again: Value = JsonCodec.unmarshal(&resp).unwrap();
        assert_eq!(again, json!({"A": "a"}));
    }

    #[test]
    fn test_unmarshal_empty_body_as_null() {
        let resp = ResponseEnvelope::new(204, "");
        let v: Option<Value> = JsonCodec.unmarshal(&resp).unwrap();
        assert!(v.is_none());
        JsonCodec.unmarshal::<()>(&resp).unwrap();
    }

    #[test]
    fn test_unmarshal_garbage_is_serialization_error() {
        let resp = ResponseEnvelope::new(200, "{not json");
        let err = JsonCodec.unmarshal::<Value>(&resp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
        assert!(err.to_string().starts_with(PHASE_DECODE_RESPONSE));
    }

    #[test]
    fn test_unmarshal_error_reads_message_list() {
        let resp = ResponseEnvelope::new(
            400,
            r#"{"api_version": "3.1", "code": 400, "kind": "error", "message_list":
                [{"message": "This field may not be blank."}], "state": "ERROR"}"#,
        );
        let err = JsonCodec.unmarshal_error(&resp);
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.to_string(), "400: This field may not be blank.");
    }

    #[test]
    fn test_unmarshal_error_includes_reason() {
        let resp = ResponseEnvelope::new(
            404,
            r#"{"code": 404, "message_list": [{"message": "vm 12 not found", "reason": "ENTITY_NOT_FOUND"}]}"#,
        );
        let err = JsonCodec.unmarshal_error(&resp);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("ENTITY_NOT_FOUND: vm 12 not found"));
    }

    #[test]
    fn test_unmarshal_error_plain_text_and_empty() {
        let err = JsonCodec.unmarshal_error(&ResponseEnvelope::new(400, "Bad Request\n"));
        assert_eq!(err.to_string(), "400: Bad Request");

        let err = JsonCodec.unmarshal_error(&ResponseEnvelope::new(503, ""));
        assert_eq!(err.to_string(), "503: Service Unavailable");
    }
}
