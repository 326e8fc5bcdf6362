//! Transports perform the external call behind an async command
//!
//! The dispatcher never talks to the network directly: it hands a bound
//! [`Request`] to a [`Transport`] and turns the outcome into a lifecycle
//! action. [`HttpTransport`] is the production implementation; tests and
//! demos plug in in-memory transports.

use crate::registry::{Method, Request};
use futures::future::BoxFuture;
use optimistic_core::{Command, DispatchError};
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Performs one external call and reports its result exactly once
pub trait Transport: Send + Sync + 'static {
    /// Execute the request
    ///
    /// The returned future must resolve to the parsed response body, or to the
    /// reason the call failed.
    fn call(&self, request: Request) -> BoxFuture<'static, Result<Value, DispatchError>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn call(&self, request: Request) -> BoxFuture<'static, Result<Value, DispatchError>> {
        (**self).call(request)
    }
}

/// A command that can be sent to a remote endpoint
///
/// `payload` supplies the fields bound into the URL template and the request
/// body; `decode_response` turns the response body into the command's typed
/// [`Command::Response`].
pub trait Remote: Command {
    /// JSON form of the command's data
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serialization`] if the command cannot be encoded.
    fn payload(&self) -> Result<Value, DispatchError>;

    /// Decode the response body for this command
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Decode`] if the body has an unexpected shape.
    fn decode_response(&self, body: Value) -> Result<Self::Response, DispatchError>;
}

/// Serialize a value into a command payload
///
/// # Errors
///
/// Returns [`DispatchError::Serialization`] if serialization fails.
pub fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|e| DispatchError::Serialization(e.to_string()))
}

/// Deserialize a response body
///
/// # Errors
///
/// Returns [`DispatchError::Decode`] if the body does not match `T`.
pub fn from_body<T: DeserializeOwned>(body: Value) -> Result<T, DispatchError> {
    serde_json::from_value(body).map_err(|e| DispatchError::Decode(e.to_string()))
}

/// How a successful response body should be read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BodyFormat {
    Empty,
    Text,
    Json,
}

fn body_format(
    content_length: Option<&str>,
    content_type: Option<&str>,
) -> Result<BodyFormat, DispatchError> {
    if content_length.map(str::trim) == Some("0") {
        return Ok(BodyFormat::Empty);
    }

    match content_type {
        Some(value) if value.contains("application/json") => Ok(BodyFormat::Json),
        Some(value) if value.contains("text/html") || value.contains("text/plain") => {
            Ok(BodyFormat::Text)
        }
        Some(value) => Err(DispatchError::UnsupportedContentType(value.to_string())),
        None => Err(DispatchError::UnsupportedContentType("<missing>".to_string())),
    }
}

/// HTTP transport backed by `reqwest`
///
/// - `GET` requests carry only `Accept: application/json`.
/// - Other methods send the request body as JSON unless it is `null`.
/// - Non-2xx responses fail with [`DispatchError::Status`].
/// - Empty responses decode to `""`, text responses to a JSON string, JSON
///   responses as-is; any other content type is
///   [`DispatchError::UnsupportedContentType`].
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that reuses an existing client
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl Transport for HttpTransport {
    fn call(&self, request: Request) -> BoxFuture<'static, Result<Value, DispatchError>> {
        let client = self.client.clone();

        Box::pin(async move {
            let mut builder = client
                .request(http_method(request.method), &request.url)
                .header(ACCEPT, "application/json");

            if request.method != Method::Get && !request.body.is_null() {
                builder = builder.json(&request.body);
            }

            tracing::debug!(method = %request.method, url = %request.url, "Calling endpoint");

            let response = builder
                .send()
                .await
                .map_err(|e| DispatchError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(DispatchError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let headers = response.headers();
            let format = body_format(
                headers.get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()),
                headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            )?;

            match format {
                BodyFormat::Empty => Ok(Value::String(String::new())),
                BodyFormat::Text => response
                    .text()
                    .await
                    .map(Value::String)
                    .map_err(|e| DispatchError::Transport(e.to_string())),
                BodyFormat::Json => response
                    .json::<Value>()
                    .await
                    .map_err(|e| DispatchError::Decode(e.to_string())),
            }
        })
    }
}
