//! Wire-format strategies
//!
//! A [`Codec`] fully describes one wire format: how a request body is placed
//! on the wire, how a successful response is decoded, and how a non-2xx
//! response is turned into an [`Error`]. The client is generic over its codec
//! and picks one at construction time, so a response is always decoded by the
//! same strategy that built the request.
//!
//! - [`JsonCodec`] - `application/json`, the v3 REST API
//! - [`XmlCodec`] - `application/xml`, SOAP-style endpoints
//! - [`UrlEncodedCodec`] - `application/x-www-form-urlencoded` query APIs

mod json;
mod urlencoded;
mod xml;

pub use json::JsonCodec;
pub use urlencoded::{build_url_encoded_request, UrlEncodedCodec};
pub use xml::XmlCodec;

use crate::error::{Error, Result};
use crate::prism::http::{RequestEnvelope, ResponseEnvelope};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

/// One wire format
pub trait Codec: Send + Sync + 'static {
    /// Value sent as `Content-Type` and `Accept`
    fn content_type(&self) -> &'static str;

    /// Place `body` into a request for `method` and `url`
    fn build_request<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<RequestEnvelope>
    where
        B: Serialize + ?Sized;

    /// Decode a successful response. The response stays readable afterwards.
    fn unmarshal<T: DeserializeOwned>(&self, response: &ResponseEnvelope) -> Result<T>;

    /// Turn a non-2xx response into a typed error
    fn unmarshal_error(&self, response: &ResponseEnvelope) -> Error;
}
