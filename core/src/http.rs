//! Request and response data exchanged with the transport collaborator.
//!
//! # Design
//! The core never touches the network. It hands a `RequestDescription` to a
//! `Transport` and gets an `HttpResponse` back, then a `ResponseDecoder`
//! turns the body bytes into typed values. Both contracts are traits so a
//! host can plug in any HTTP client and any serialization format.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross FFI
//! boundaries without lifetime concerns.

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::descriptor::HttpVerb;
use crate::error::{DecodeError, TransportError};

/// A fully populated request, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescription {
    pub verb: HttpVerb,
    /// Concrete path, relative to the base URL unless a url binding supplied
    /// an absolute one.
    pub path: String,
    /// Encoded query pairs; `None` is a valueless key.
    #[serde(default)]
    pub query: Vec<(String, Option<String>)>,
    #[serde(default)]
    pub fragment: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Serialized cookies, `name=value` followed by attributes.
    #[serde(default)]
    pub cookies: Vec<String>,
    /// Encoded body fields of a form-encoded endpoint; `None` otherwise.
    #[serde(default)]
    pub form: Option<Vec<(String, String)>>,
    /// Request attributes for the transport. Never sent on the wire.
    #[serde(default)]
    pub tags: Vec<(String, String)>,
}

impl RequestDescription {
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(name, value)| match value {
                Some(value) => format!("{name}={value}"),
                None => name.clone(),
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Path, query and fragment joined.
    pub fn target(&self) -> String {
        let mut target = self.path.clone();
        self.append_query_and_fragment(&mut target);
        target
    }

    /// Absolute URL against `base_url`. An absolute path (from a url
    /// binding) ignores the base.
    pub fn url(&self, base_url: &str) -> String {
        let mut url = if self.path.starts_with("http://") || self.path.starts_with("https://") {
            self.path.clone()
        } else {
            format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                self.path.trim_start_matches('/')
            )
        };
        self.append_query_and_fragment(&mut url);
        url
    }

    /// Value for a request `Cookie` header: the `name=value` part of each
    /// cookie. `None` when there are no cookies.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<&str> = self
            .cookies
            .iter()
            .map(|cookie| cookie.split(';').next().unwrap_or(cookie).trim())
            .collect();
        Some(pairs.join("; "))
    }

    /// The `application/x-www-form-urlencoded` body, `None` when the
    /// endpoint is not form-encoded. Every field may be skipped, which
    /// leaves an empty body.
    pub fn form_body(&self) -> Option<String> {
        self.form.as_ref().map(|fields| {
            fields
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("&")
        })
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(tag, _)| tag == name)
            .map(|(_, value)| value.as_str())
    }

    fn append_query_and_fragment(&self, out: &mut String) {
        if !self.query.is_empty() {
            out.push(if out.contains('?') { '&' } else { '?' });
            out.push_str(&self.query_string());
        }
        if let Some(fragment) = &self.fragment {
            out.push('#');
            out.push_str(fragment);
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a request and yields the response.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: RequestDescription,
    ) -> BoxFuture<'static, Result<HttpResponse, TransportError>>;
}

/// Turns response bytes into typed values.
pub trait ResponseDecoder: Send + Sync + 'static {
    fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, DecodeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ResponseDecoder for JsonDecoder {
    fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, DecodeError> {
        serde_json::from_slice(body).map_err(|e| DecodeError::new(e.to_string()))
    }
}
