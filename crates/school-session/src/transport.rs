use std::time::Duration;

use async_trait::async_trait;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::TransportError;

/// Everything but RFC 3986 unreserved characters.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// An outgoing API request, relative to the transport's base URL.
///
/// Cloneable so a request can be reissued after a token refresh.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post_json<T: Serialize>(path: impl Into<String>, body: &T) -> serde_json::Result<Self> {
        let payload = serde_json::to_vec(body)?;
        let mut request = Self::new(Method::POST, path);
        request.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        request.body = Some(payload);
        Ok(request)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends `key=value` to the query string, percent-encoding the value.
    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        let separator = if self.path.contains('?') { '&' } else { '?' };
        self.path.push(separator);
        self.path.push_str(key);
        self.path.push('=');
        self.path
            .extend(utf8_percent_encode(&value.to_string(), QUERY_VALUE));
        self
    }

    /// The bearer token carried by this request, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// A fully buffered API response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn json_body<T: Serialize>(status: StatusCode, body: &T) -> serde_json::Result<Self> {
        let mut response = Self::new(status, serde_json::to_vec(body)?);
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(response)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// The `"<status> <reason> - <body>"` line shown to users on failure.
    pub fn error_message(&self) -> String {
        let reason = self.status.canonical_reason().unwrap_or("");
        format!("{} {} - {}", self.status.as_u16(), reason, self.text())
    }
}

/// The HTTP boundary. Implementations issue exactly one request per call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// reqwest-backed transport resolving request paths against a base URL.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<String, TransportError> {
        if !path.starts_with('/') {
            return Err(TransportError::InvalidRequest(format!(
                "path must be absolute: {path}"
            )));
        }
        Ok(format!("{}{}", self.base_url, path))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        tracing::debug!("{} {url}", request.method);

        let mut builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|source| TransportError::Request {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|source| TransportError::Request { url, source })?;

        Ok(ApiResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_query_appends_and_encodes() {
        let request = ApiRequest::get("/api/assignments/")
            .with_query("school", 4)
            .with_query("q", "a b&c");
        assert_eq!(request.path, "/api/assignments/?school=4&q=a%20b%26c");

        let request = ApiRequest::get("/api/schools/").with_query("name", "Zoë-High_1.~");
        assert_eq!(request.path, "/api/schools/?name=Zo%C3%AB-High_1.~");
    }

    #[test]
    fn post_json_sets_content_type() {
        let request =
            ApiRequest::post_json("/api/schools/", &serde_json::json!({"name": "North"})).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.headers.get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(request.body.as_deref(), Some(br#"{"name":"North"}"#.as_slice()));
    }

    #[test]
    fn error_message_includes_status_reason_and_body() {
        let response = ApiResponse::new(StatusCode::BAD_REQUEST, "title: required");
        assert_eq!(response.error_message(), "400 Bad Request - title: required");
    }

    #[test]
    fn http_transport_rejects_relative_paths() {
        let transport = HttpTransport::new("http://localhost:8000/", None).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8000");
        assert!(transport.url_for("api/schools/").is_err());
        assert_eq!(
            transport.url_for("/api/schools/").unwrap(),
            "http://localhost:8000/api/schools/"
        );
    }
}
