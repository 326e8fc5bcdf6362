//! Endpoint registry
//!
//! Maps command kinds to the remote endpoint that performs them. A kind with
//! an endpoint is dispatched as an async transaction; every other kind is a
//! synchronous command.

use crate::template::{bind_path_variables, request_body};
use optimistic_core::DispatchError;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// HTTP method of an endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Upper-case method name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote operation: method plus URL template
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    /// HTTP method
    pub method: Method,
    /// URL with `{name}` placeholders bound from the command payload
    pub url_template: String,
}

impl Endpoint {
    /// Create an endpoint
    pub fn new(method: Method, url_template: impl Into<String>) -> Self {
        Self {
            method,
            url_template: url_template.into(),
        }
    }

    /// Build the request for a command payload
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MissingPathVariable`] when the payload does not
    /// provide every placeholder in the URL template.
    pub fn request(&self, payload: &Value) -> Result<Request, DispatchError> {
        Ok(Request {
            method: self.method,
            url: bind_path_variables(&self.url_template, payload)?,
            body: request_body(&self.url_template, payload),
        })
    }
}

/// A fully bound call, ready for a [`Transport`](crate::transport::Transport)
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Bound URL
    pub url: String,
    /// JSON body; `Null` means no body
    pub body: Value,
}

/// Command kind → endpoint table
///
/// # Example
///
/// ```
/// use optimistic_runtime::registry::{Method, Registry};
///
/// let registry = Registry::new()
///     .with_prefix("http://localhost:4000")
///     .route("DELETE_TODO", Method::Delete, "/todos/{id}");
///
/// let endpoint = registry.endpoint("DELETE_TODO").unwrap();
/// assert_eq!(endpoint.url_template, "http://localhost:4000/todos/{id}");
/// assert!(registry.endpoint("SET_FILTER").is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Registry {
    prefix: String,
    endpoints: HashMap<&'static str, Endpoint>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prefix` to every URL template registered afterwards
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    /// Register the endpoint for a command kind
    #[must_use]
    pub fn route(mut self, kind: &'static str, method: Method, url_template: &str) -> Self {
        self.insert(kind, method, url_template);
        self
    }

    /// Register the endpoint for a command kind, replacing any previous one
    pub fn insert(&mut self, kind: &'static str, method: Method, url_template: &str) {
        let endpoint = Endpoint::new(method, format!("{}{url_template}", self.prefix));
        self.endpoints.insert(kind, endpoint);
    }

    /// The endpoint for a command kind, if it needs a remote call
    #[must_use]
    pub fn endpoint(&self, kind: &str) -> Option<&Endpoint> {
        self.endpoints.get(kind)
    }

    /// Whether commands of this kind are dispatched asynchronously
    #[must_use]
    pub fn is_async(&self, kind: &str) -> bool {
        self.endpoints.contains_key(kind)
    }

    /// The URL prefix
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of registered kinds
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether no kind is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
