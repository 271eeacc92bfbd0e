//! Property-based tests using proptest
//!
//! These tests verify determinism and round-tripping of the URL-encoded
//! codec, and that error decoding never panics on arbitrary bodies.

use prism_client::{
    build_url_encoded_request, Codec, ErrorKind, JsonCodec, ResponseEnvelope, UrlEncodedCodec,
    XmlCodec,
};
use proptest::prelude::*;
use reqwest::Method;
use std::collections::{BTreeMap, HashMap};
use url::Url;

/// Field names as a query API would declare them
fn arb_key() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z]{0,10}".prop_filter("reserved field", |k| k != "Action" && k != "Version")
}

/// Arbitrary request fields, including list-valued ones
fn arb_fields() -> impl Strategy<Value = BTreeMap<String, Vec<String>>> {
    prop::collection::btree_map(arb_key(), prop::collection::vec("\\PC{0,16}", 1..4), 0..8)
}

fn base_url() -> Url {
    Url::parse("https://prism.local:9440/api").unwrap()
}

proptest! {
    /// Insertion order of the input never changes the output
    #[test]
    fn marshal_is_deterministic(fields in arb_fields()) {
        let forward: HashMap<_, _> = fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let reversed: HashMap<_, _> = fields.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();

        let a = UrlEncodedCodec::marshal(&forward, "DescribeInstances", "2017-12-15").unwrap();
        let b = UrlEncodedCodec::marshal(&reversed, "DescribeInstances", "2017-12-15").unwrap();
        prop_assert_eq!(a, b);
    }

    /// Keys come out sorted, with Action and Version present exactly once
    #[test]
    fn marshal_sorts_keys(fields in arb_fields()) {
        let out = UrlEncodedCodec::marshal(&fields, "RunInstances", "v1").unwrap();
        let keys: Vec<&str> = out.split('&').map(|pair| pair.split('=').next().unwrap()).collect();

        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(&keys, &sorted);
        prop_assert_eq!(keys.iter().filter(|k| **k == "Action").count(), 1);
        prop_assert_eq!(keys.iter().filter(|k| **k == "Version").count(), 1);

        let list_items: usize = fields.values().map(Vec::len).sum();
        prop_assert_eq!(keys.len(), list_items + 2);
    }

    /// POST and GET place the encoded body where it can be read back unchanged
    #[test]
    fn build_request_round_trips(fields in arb_fields()) {
        let body = UrlEncodedCodec::marshal(&fields, "ModifyInstance", "v2").unwrap();

        let post = build_url_encoded_request(Method::POST, base_url(), &body).unwrap();
        let text = post.body_text().unwrap();
        prop_assert_eq!(text.as_ref(), body.as_str());

        let get = build_url_encoded_request(Method::GET, base_url(), &body).unwrap();
        prop_assert_eq!(get.url.query(), Some(body.as_str()));
        prop_assert!(get.body.is_none());
    }

    /// Any GET body that is accepted comes back from the URL unchanged
    #[test]
    fn accepted_get_bodies_are_verbatim(body in "\\PC{0,32}") {
        match build_url_encoded_request(Method::GET, base_url(), &body) {
            Ok(get) if body.is_empty() => prop_assert_eq!(get.url.query(), None),
            Ok(get) => prop_assert_eq!(get.url.query(), Some(body.as_str())),
            Err(err) => prop_assert_eq!(err.kind(), ErrorKind::Serialization),
        }

        let post = build_url_encoded_request(Method::POST, base_url(), &body).unwrap();
        let text = post.body_text().unwrap();
        prop_assert_eq!(text.as_ref(), body.as_str());
    }

    /// Percent-encoded query strings are always accepted
    #[test]
    fn encoded_get_bodies_are_accepted(pairs in prop::collection::vec(("\\PC{1,8}", "\\PC{0,8}"), 1..5)) {
        let body = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let get = build_url_encoded_request(Method::GET, base_url(), &body).unwrap();
        prop_assert_eq!(get.url.query(), Some(body.as_str()));
    }

    /// Only GET and POST can carry a URL-encoded body
    #[test]
    fn other_methods_are_rejected(
        method in prop_oneof![
            Just(Method::PUT),
            Just(Method::DELETE),
            Just(Method::PATCH),
            Just(Method::HEAD),
        ]
    ) {
        let err = build_url_encoded_request(method, base_url(), "Action=A&Version=1").unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    /// Any non-2xx body yields an error value rather than a panic
    #[test]
    fn error_decoding_never_panics(status in 300u16..600, body in prop::collection::vec(any::<u8>(), 0..64)) {
        let resp = ResponseEnvelope::new(status, body);

        let json_err = JsonCodec.unmarshal_error(&resp);
        prop_assert_eq!(json_err.kind(), ErrorKind::Http);

        let xml_err = XmlCodec.unmarshal_error(&resp);
        prop_assert!(matches!(xml_err.kind(), ErrorKind::Http | ErrorKind::Serialization));
    }
}
