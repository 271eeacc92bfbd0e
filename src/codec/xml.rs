//! XML codec for SOAP-style endpoints
//!
//! Server errors come back as
//! `<Response><Errors><Error><Code/><Message/></Error></Errors><RequestID/></Response>`.

use super::Codec;
use crate::error::{Error, Result, PHASE_BUILD_REQUEST, PHASE_DECODE_ERROR, PHASE_DECODE_RESPONSE};
use crate::prism::http::{RequestEnvelope, ResponseEnvelope};
use bytes::Bytes;
use reqwest::Method;
use serde::de::value::UnitDeserializer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

const CONTENT_TYPE: &str = "application/xml";

/// XML request/response strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

#[derive(Debug, Deserialize)]
struct ErrorDocument {
    #[serde(rename = "Errors", default)]
    errors: ErrorList,
    #[serde(rename = "RequestID", default)]
    request_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorList {
    #[serde(rename = "Error", default)]
    entries: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

fn body_str<'a>(response: &'a ResponseEnvelope, phase: &'static str) -> Result<&'a str> {
    std::str::from_utf8(&response.body).map_err(|e| Error::serialization(phase, e))
}

impl Codec for XmlCodec {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    fn build_request<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<RequestEnvelope>
    where
        B: Serialize + ?Sized,
    {
        let body = match body {
            Some(body) => Some(Bytes::from(
                quick_xml::se::to_string(body)
                    .map_err(|e| Error::serialization(PHASE_BUILD_REQUEST, e))?,
            )),
            None => None,
        };

        Ok(RequestEnvelope::new(method, url, CONTENT_TYPE, body))
    }

    fn unmarshal<T: DeserializeOwned>(&self, response: &ResponseEnvelope) -> Result<T> {
        let text = body_str(response, PHASE_DECODE_RESPONSE)?;

        // Empty documents decode like a missing value so `()` and `Option<T>` work
        if text.trim().is_empty() {
            return T::deserialize(UnitDeserializer::<serde::de::value::Error>::new())
                .map_err(|e| Error::serialization(PHASE_DECODE_RESPONSE, e));
        }

        quick_xml::de::from_str(text).map_err(|e| Error::serialization(PHASE_DECODE_RESPONSE, e))
    }

    fn unmarshal_error(&self, response: &ResponseEnvelope) -> Error {
        let text = match body_str(response, PHASE_DECODE_ERROR) {
            Ok(text) => text,
            Err(err) => return err,
        };

        let doc: ErrorDocument = match quick_xml::de::from_str(text) {
            Ok(doc) => doc,
            Err(e) => return Error::serialization(PHASE_DECODE_ERROR, e),
        };

        // Only the first entry is reported; an empty list is a malformed error body
        let Some(first) = doc.errors.entries.into_iter().next() else {
            return Error::serialization(
                PHASE_DECODE_ERROR,
                format!(
                    "status {} error response contained no <Error> entries (request id: {})",
                    response.status,
                    doc.request_id.as_deref().unwrap_or("none")
                ),
            );
        };

        tracing::debug!(
            "XML error response: code={} request_id={:?}",
            first.code,
            doc.request_id
        );

        Error::Http {
            status: response.status,
            code: first.code,
            message: first.message,
        }
    }
}
