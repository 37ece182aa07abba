//! Client for the remote document store.
//!
//! Documents live in JSONBin. Every network failure, non-success status and
//! unexpected response shape is turned into a [`DiaryError`] here, so nothing
//! above this module sees `reqwest` or raw JSON envelopes.

use crate::config::Config;
use crate::diary_entry::DiaryEntry;
use crate::error::{DiaryError, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;

const API_KEY_HEADER: &str = "x-master-key";
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Create/fetch/overwrite access to documents addressed by location URL.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Stores a new document and returns its location.
    async fn create_document(&self, payload: &Value) -> Result<String>;

    /// Reads the document at `location` as a diary entry.
    async fn fetch_document(&self, location: &str) -> Result<DiaryEntry>;

    /// Replaces the content at `location`. An empty object blanks the document.
    async fn overwrite_document(&self, location: &str, payload: &Value) -> Result<()>;

    /// Whether an existing location can be rewritten in place.
    fn supports_overwrite(&self) -> bool {
        true
    }
}

pub struct JsonBinClient {
    http: reqwest::Client,
    api_base: String,
    location_base: String,
}

#[derive(Deserialize)]
struct CreateEnvelope {
    metadata: CreateMetadata,
}

#[derive(Deserialize)]
struct CreateMetadata {
    id: String,
}

#[derive(Deserialize)]
struct FetchEnvelope {
    record: Value,
}

impl JsonBinClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_builder(config, reqwest::Client::builder())
    }

    fn with_builder(config: &Config, builder: reqwest::ClientBuilder) -> Result<Self> {
        let mut key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            DiaryError::Config("API key contains characters not allowed in a header".to_string())
        })?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = builder
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DiaryError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(JsonBinClient {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            location_base: config.location_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn location_for(&self, id: &str) -> String {
        format!("{}/{}", self.location_base, id)
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.api_base, id)
    }
}

#[async_trait]
impl RemoteStore for JsonBinClient {
    async fn create_document(&self, payload: &Value) -> Result<String> {
        debug!("event=remote_request method=POST url={}", self.api_base);
        let response = self
            .http
            .post(&self.api_base)
            .json(payload)
            .send()
            .await
            .map_err(|e| DiaryError::RemoteWrite(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DiaryError::RemoteWrite(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(DiaryError::RemoteWrite(format!(
                "store returned {status}: {}",
                truncate_error(&body)
            )));
        }

        let id = parse_create_response(&body)?;
        Ok(self.location_for(&id))
    }

    async fn fetch_document(&self, location: &str) -> Result<DiaryEntry> {
        let id = bin_id_from_location(location)
            .ok_or_else(|| DiaryError::RemoteRead(format!("not a document location: {location}")))?;
        let url = self.document_url(&id);
        debug!("event=remote_request method=GET url={url}");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DiaryError::RemoteRead(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DiaryError::RemoteRead(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(DiaryError::RemoteRead(format!(
                "store returned {status}: {}",
                truncate_error(&body)
            )));
        }

        parse_fetch_response(&body)
    }

    async fn overwrite_document(&self, location: &str, payload: &Value) -> Result<()> {
        let id = bin_id_from_location(location).ok_or_else(|| {
            DiaryError::RemoteWrite(format!("not a document location: {location}"))
        })?;
        let url = self.document_url(&id);
        debug!("event=remote_request method=PUT url={url}");

        let response = self
            .http
            .put(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DiaryError::RemoteWrite(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiaryError::RemoteWrite(format!(
                "store returned {status}: {}",
                truncate_error(&body)
            )));
        }
        Ok(())
    }
}

/// Extracts the provider id, the last non-empty path segment of a location.
pub fn bin_id_from_location(location: &str) -> Option<String> {
    let url = reqwest::Url::parse(location).ok()?;
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

fn parse_create_response(body: &str) -> Result<String> {
    serde_json::from_str::<CreateEnvelope>(body)
        .map(|envelope| envelope.metadata.id)
        .map_err(|e| DiaryError::RemoteWrite(format!("unexpected create response: {e}")))
}

fn parse_fetch_response(body: &str) -> Result<DiaryEntry> {
    let envelope: FetchEnvelope = serde_json::from_str(body)
        .map_err(|e| DiaryError::MalformedEntry(format!("unexpected fetch response: {e}")))?;
    DiaryEntry::from_json(envelope.record)
}

fn truncate_error(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn client() -> JsonBinClient {
        let mut config = Config::new("test-key");
        config.api_base = "http://localhost:9/v3/b/".to_string();
        config.location_base = "https://jsonbin.io".to_string();
        JsonBinClient::new(&config).unwrap()
    }

    #[test]
    fn test_bin_id_from_location() {
        assert_eq!(
            bin_id_from_location("https://jsonbin.io/abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            bin_id_from_location("https://jsonbin.io/b/abc123/").as_deref(),
            Some("abc123")
        );
        assert_eq!(bin_id_from_location("https://jsonbin.io/"), None);
        assert_eq!(bin_id_from_location("not a url"), None);
    }

    #[test]
    fn test_location_and_document_url() {
        let client = client();
        assert_eq!(client.location_for("abc123"), "https://jsonbin.io/abc123");
        assert_eq!(client.document_url("abc123"), "http://localhost:9/v3/b/abc123");
    }

    #[test]
    fn test_rejects_key_with_newline() {
        let config = Config::new("bad\nkey");
        assert!(matches!(
            JsonBinClient::new(&config),
            Err(DiaryError::Config(_))
        ));
    }

    #[test]
    fn test_parse_create_response() {
        let body = r#"{"record":{"title":"Trip"},"metadata":{"id":"abc123","private":true}}"#;
        assert_eq!(parse_create_response(body).unwrap(), "abc123");

        let err = parse_create_response(r#"{"message":"Invalid key"}"#).unwrap_err();
        assert!(matches!(err, DiaryError::RemoteWrite(_)));
    }

    #[test]
    fn test_parse_fetch_response() {
        let body = r#"{"record":{"title":"Trip","description":"Went hiking","date":"2024-01-01T10:00:00"},"metadata":{"id":"abc123"}}"#;
        let entry = parse_fetch_response(body).unwrap();
        assert_eq!(
            entry,
            DiaryEntry::with_timestamp("Trip", "Went hiking", "2024-01-01T10:00:00")
        );
    }

    #[test]
    fn test_parse_fetch_response_blanked_record_is_malformed() {
        let err = parse_fetch_response(r#"{"record":{},"metadata":{}}"#).unwrap_err();
        assert!(matches!(err, DiaryError::MalformedEntry(_)));

        let err = parse_fetch_response(r#"{"metadata":{}}"#).unwrap_err();
        assert!(matches!(err, DiaryError::MalformedEntry(_)));
    }

    #[test]
    fn test_truncate_error() {
        let long = "x".repeat(500);
        let truncated = truncate_error(&long);
        assert_eq!(truncated.len(), MAX_ERROR_BODY_CHARS + 3);
        assert_eq!(truncate_error("short"), "short");
    }

    /// Serves one canned response on a loopback port and hands back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (JsonBinClient, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        let mut config = Config::new("test-key");
        config.api_base = format!("http://{addr}/v3/b");
        config.location_base = "https://jsonbin.io".to_string();
        let client =
            JsonBinClient::with_builder(&config, reqwest::Client::builder().no_proxy()).unwrap();
        (client, handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let content_length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn assert_standard_headers(request: &str) {
        let lower = request.to_lowercase();
        assert!(lower.contains("\r\nx-master-key: test-key\r\n"), "{request}");
        assert!(lower.contains("\r\ncontent-type: application/json\r\n"), "{request}");
    }

    #[tokio::test]
    async fn test_create_posts_to_api_base() {
        let (client, server) = serve_once("200 OK", r#"{"record":{},"metadata":{"id":"abc"}}"#).await;

        let entry = DiaryEntry::with_timestamp("Trip", "Went hiking", "2024-01-01");
        let location = client.create_document(&entry.to_json()).await.unwrap();
        assert_eq!(location, "https://jsonbin.io/abc");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v3/b HTTP/1.1\r\n"), "{request}");
        assert_standard_headers(&request);
        assert!(request.contains(r#""description":"Went hiking""#));
    }

    #[tokio::test]
    async fn test_create_error_status_is_write_error() {
        let (client, server) = serve_once("401 Unauthorized", r#"{"message":"Invalid key"}"#).await;

        let err = client
            .create_document(&serde_json::json!({"title": "Trip"}))
            .await
            .unwrap_err();
        assert!(matches!(err, DiaryError::RemoteWrite(ref m) if m.contains("401")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_gets_by_id() {
        let (client, server) = serve_once(
            "200 OK",
            r#"{"record":{"title":"Trip","description":"Went hiking","date":"2024-01-01"},"metadata":{"id":"abc"}}"#,
        )
        .await;

        let entry = client.fetch_document("https://jsonbin.io/abc").await.unwrap();
        assert_eq!(entry, DiaryEntry::with_timestamp("Trip", "Went hiking", "2024-01-01"));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v3/b/abc HTTP/1.1\r\n"), "{request}");
        assert_standard_headers(&request);
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_read_error() {
        let (client, server) = serve_once("404 Not Found", r#"{"message":"Bin not found"}"#).await;

        let err = client.fetch_document("https://jsonbin.io/abc").await.unwrap_err();
        assert!(matches!(err, DiaryError::RemoteRead(ref m) if m.contains("404")));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v3/b/abc "), "{request}");
    }

    #[tokio::test]
    async fn test_fetch_blanked_record_is_malformed() {
        let (client, server) = serve_once("200 OK", r#"{"record":{},"metadata":{"id":"abc"}}"#).await;

        let err = client.fetch_document("https://jsonbin.io/abc").await.unwrap_err();
        assert!(matches!(err, DiaryError::MalformedEntry(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_overwrite_puts_by_id() {
        let (client, server) = serve_once("200 OK", r#"{"record":{},"metadata":{}}"#).await;

        client
            .overwrite_document("https://jsonbin.io/abc", &serde_json::json!({}))
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /v3/b/abc HTTP/1.1\r\n"), "{request}");
        assert_standard_headers(&request);
        assert!(request.ends_with("\r\n\r\n{}"), "{request}");
    }

    #[tokio::test]
    async fn test_overwrite_error_status_is_write_error() {
        let (client, server) = serve_once("500 Internal Server Error", "oops").await;

        let err = client
            .overwrite_document("https://jsonbin.io/abc", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, DiaryError::RemoteWrite(ref m) if m.contains("500")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_store_is_read_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = Config::new("test-key");
        config.api_base = format!("http://{addr}/v3/b");
        let client =
            JsonBinClient::with_builder(&config, reqwest::Client::builder().no_proxy()).unwrap();

        let err = client.fetch_document("https://jsonbin.io/abc").await.unwrap_err();
        assert!(matches!(err, DiaryError::RemoteRead(_)));
    }

    #[tokio::test]
    async fn test_fetch_bad_location_is_read_error() {
        let err = client().fetch_document("garbage").await.unwrap_err();
        assert!(matches!(err, DiaryError::RemoteRead(_)));
    }

    #[tokio::test]
    async fn test_overwrite_bad_location_is_write_error() {
        let err = client()
            .overwrite_document("garbage", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, DiaryError::RemoteWrite(_)));
    }
}
