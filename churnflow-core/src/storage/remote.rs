//! Remote object store backends.
//!
//! [`HttpObjectStore`] talks to AWS S3 or any S3-compatible endpoint using
//! path-style `PUT`/`GET` requests, signed with SigV4 when an access key is
//! configured. [`InMemoryObjectStore`] keeps objects in a process map and
//! counts requests, for tests and dry runs.

use crate::config::RemoteConfig;
use crate::error::{StoreError, StoreResult};
use crate::persistence::sha256_hex;
use crate::storage::sigv4::{self, Credentials};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Byte-level access to a remote object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable location of an object, for logs.
    fn describe(&self, key: &str) -> String;

    /// Upload `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> StoreResult<()>;

    /// Download the object under `key`. `Ok(None)` means it does not exist.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
}

// ---------------------------------------------------------------------------
// HttpObjectStore
// ---------------------------------------------------------------------------

/// S3-compatible object store reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: Url,
    bucket: String,
    region: String,
    credentials: Option<Credentials>,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn from_config(config: &RemoteConfig) -> StoreResult<Self> {
        if config.bucket.trim().is_empty() {
            return Err(StoreError::configuration("remote bucket name is empty"));
        }
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            StoreError::configuration(format!(
                "invalid remote endpoint '{}': {e}",
                config.endpoint
            ))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::configuration(format!(
                "remote endpoint '{}' cannot carry object paths",
                config.endpoint
            )));
        }

        let credentials = match (
            non_blank(&config.access_key_id),
            non_blank(&config.secret_access_key),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(Credentials {
                access_key_id,
                secret_access_key,
                session_token: non_blank(&config.session_token),
            }),
            (None, None) => None,
            _ => {
                return Err(StoreError::configuration(
                    "remote access_key_id and secret_access_key must be set together",
                ));
            }
        };

        let client = reqwest::Client::builder()
            .user_agent(concat!("churnflow/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::remote(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            bucket: config.bucket.trim().to_string(),
            region: config.region.trim().to_string(),
            credentials,
            token: non_blank(&config.token),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn is_signed(&self) -> bool {
        self.credentials.is_some()
    }

    // The path is encoded once here so the wire path and the signed path agree.
    fn object_url(&self, key: &str) -> StoreResult<Url> {
        let mut path = self.endpoint.path().trim_end_matches('/').to_string();
        path.push('/');
        path.push_str(&sigv4::encode_segment(&self.bucket));
        for segment in key.split('/') {
            path.push('/');
            path.push_str(&sigv4::encode_segment(segment));
        }
        let mut url = self.endpoint.clone();
        url.set_path(&path);
        Ok(url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        key: &str,
        payload: &[u8],
    ) -> StoreResult<reqwest::RequestBuilder> {
        let url = self.object_url(key)?;
        let Some(credentials) = &self.credentials else {
            let builder = self.client.request(method, url);
            return Ok(match &self.token {
                Some(token) => builder.bearer_auth(token),
                None => builder,
            });
        };

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(StoreError::configuration("remote endpoint has no host"));
            }
        };
        let amz_date = sigv4::amz_date(Utc::now());
        let content_sha256 = sha256_hex(payload);

        let mut headers = vec![
            ("host", host),
            ("x-amz-content-sha256", content_sha256.clone()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(session) = &credentials.session_token {
            headers.push(("x-amz-security-token", session.clone()));
        }
        let authorization = sigv4::authorization(
            method.as_str(),
            url.path(),
            &headers,
            &content_sha256,
            &amz_date,
            &self.region,
            credentials,
        )?;

        let mut builder = self
            .client
            .request(method, url)
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", content_sha256)
            .header(reqwest::header::AUTHORIZATION, authorization);
        if let Some(session) = &credentials.session_token {
            builder = builder.header("x-amz-security-token", session);
        }
        Ok(builder)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn describe(&self, key: &str) -> String {
        format!("s3://{}/{key}", self.bucket)
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> StoreResult<()> {
        let response = self
            .request(reqwest::Method::PUT, key, &bytes)?
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::remote(format!("PUT {} failed: {e}", self.describe(key))))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::remote(format!(
                "PUT {} returned {status}: {}",
                self.describe(key),
                body.trim()
            )));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let response = self
            .request(reqwest::Method::GET, key, &[])?
            .send()
            .await
            .map_err(|e| StoreError::remote(format!("GET {} failed: {e}", self.describe(key))))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::remote(format!(
                "GET {} returned {status}: {}",
                self.describe(key),
                body.trim()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            StoreError::remote(format!("reading {} failed: {e}", self.describe(key)))
        })?;
        Ok(Some(bytes.to_vec()))
    }
}

// ---------------------------------------------------------------------------
// InMemoryObjectStore
// ---------------------------------------------------------------------------

/// Process-local object store that records every request.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    fail_puts: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a request.
    pub fn with_object(self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.lock().insert(key.into(), bytes.into());
        self
    }

    /// Make every subsequent `put` fail with a remote error.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Total requests of any kind.
    pub fn request_count(&self) -> usize {
        self.get_count() + self.put_count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map is still a valid map.
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn describe(&self, key: &str) -> String {
        format!("memory://{key}")
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::remote(format!(
                "PUT {} rejected",
                self.describe(key)
            )));
        }
        self.lock().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.lock().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn http_store(endpoint: &str) -> HttpObjectStore {
        HttpObjectStore::from_config(&RemoteConfig::new(endpoint, "churn-artifacts")).unwrap()
    }

    #[test]
    fn test_object_url_is_path_style() {
        let store = http_store("http://localhost:9000/");
        let url = store.object_url("prod/artifacts/model.json").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/churn-artifacts/prod/artifacts/model.json"
        );
    }

    #[test]
    fn test_object_url_escapes_segments() {
        let store = http_store("http://localhost:9000");
        let url = store.object_url("data/churn v2.csv").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/churn-artifacts/data/churn%20v2.csv"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_configuration_error() {
        let err = HttpObjectStore::from_config(&RemoteConfig::new("not a url", "bucket")).unwrap_err();
        assert!(matches!(err, StoreError::Configuration { .. }));

        let err = HttpObjectStore::from_config(&RemoteConfig::new("http://localhost", "")).unwrap_err();
        assert!(matches!(err, StoreError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_http_put_sends_bytes_and_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/churn-artifacts/artifacts/scaler.json")
            .match_header("authorization", "Bearer secret")
            .match_body("{\"min\":[10.0]}")
            .with_status(200)
            .create_async()
            .await;

        let mut config = RemoteConfig::new(server.url(), "churn-artifacts");
        config.token = Some("secret".into());
        let store = HttpObjectStore::from_config(&config).unwrap();

        store
            .put("artifacts/scaler.json", b"{\"min\":[10.0]}".to_vec())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn test_half_configured_key_pair_is_rejected() {
        let mut config = RemoteConfig::new("http://localhost:9000", "churn-artifacts");
        config.access_key_id = Some("AKID".into());
        let err = HttpObjectStore::from_config(&config).unwrap_err();
        assert!(matches!(err, StoreError::Configuration { .. }));

        config.secret_access_key = Some("secret".into());
        assert!(HttpObjectStore::from_config(&config).unwrap().is_signed());
    }

    #[tokio::test]
    async fn test_http_put_is_sigv4_signed_with_access_key() {
        let mut server = mockito::Server::new_async().await;
        let payload = b"{\"max\":[20.0]}".to_vec();
        let mock = server
            .mock("PUT", "/churn-artifacts/artifacts/scaler.json")
            .match_header(
                "authorization",
                Matcher::Regex(
                    "^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/[0-9]{8}/eu-west-1/s3/aws4_request, \
                     SignedHeaders=host;x-amz-content-sha256;x-amz-date;x-amz-security-token, \
                     Signature=[0-9a-f]{64}$"
                        .into(),
                ),
            )
            .match_header("x-amz-content-sha256", sha256_hex(&payload).as_str())
            .match_header("x-amz-date", Matcher::Regex("^[0-9]{8}T[0-9]{6}Z$".into()))
            .match_header("x-amz-security-token", "session")
            .with_status(200)
            .create_async()
            .await;

        let mut config = RemoteConfig::new(server.url(), "churn-artifacts");
        config.region = "eu-west-1".into();
        config.access_key_id = Some("AKIDEXAMPLE".into());
        config.secret_access_key = Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into());
        config.session_token = Some("session".into());
        config.token = Some("ignored-when-signing".into());
        let store = HttpObjectStore::from_config(&config).unwrap();

        store.put("artifacts/scaler.json", payload).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_get_maps_404_to_none() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/churn-artifacts/artifacts/model.json")
            .with_status(404)
            .create_async()
            .await;

        let store = http_store(&server.url());
        assert!(store.get("artifacts/model.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_http_get_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let _found = server
            .mock("GET", "/churn-artifacts/artifacts/encoder.json")
            .with_status(200)
            .with_body("encoder-bytes")
            .create_async()
            .await;

        let store = http_store(&server.url());
        let bytes = store.get("artifacts/encoder.json").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"encoder-bytes"[..]));
    }

    #[tokio::test]
    async fn test_http_server_error_surfaces() {
        let mut server = mockito::Server::new_async().await;
        let _broken = server
            .mock("PUT", "/churn-artifacts/artifacts/model.json")
            .with_status(503)
            .with_body("slow down")
            .create_async()
            .await;

        let store = http_store(&server.url());
        let err = store
            .put("artifacts/model.json", b"{}".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Remote { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_in_memory_counts_requests() {
        let store = InMemoryObjectStore::new().with_object("a", b"1".to_vec());
        assert_eq!(store.request_count(), 0);

        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get("b").await.unwrap(), None);
        store.put("b", b"2".to_vec()).await.unwrap();

        assert_eq!(store.get_count(), 2);
        assert_eq!(store.put_count(), 1);
        assert!(store.contains("b"));
    }

    #[tokio::test]
    async fn test_in_memory_upload_failure() {
        let store = InMemoryObjectStore::new();
        store.fail_uploads(true);
        assert!(store.put("k", vec![]).await.is_err());
        assert!(!store.contains("k"));
    }
}
