use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, ETAG, IF_MATCH};
use reqwest::{Client, Method, StatusCode};

static MKCOL: LazyLock<Method> =
    LazyLock::new(|| Method::from_bytes(b"MKCOL").expect("MKCOL is a valid method token"));

/// Errors surfaced by the WebDAV layer.
#[derive(Debug, thiserror::Error)]
pub enum DavError {
    #[error("{method} {url} failed: {source}")]
    Http {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} returned {status}")]
    Status {
        method: &'static str,
        url: String,
        status: StatusCode,
    },
}

/// Snapshot of a remote document as seen by a single GET.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteDocument {
    pub found: bool,
    pub content: String,
    /// Raw ETag header value, quotes included, suitable for `If-Match`.
    pub etag: Option<String>,
}

impl RemoteDocument {
    pub fn missing() -> Self {
        Self::default()
    }

    /// The precondition a write based on this snapshot should carry.
    pub fn put_condition(&self) -> PutCondition<'_> {
        match self.etag.as_deref() {
            Some(etag) => PutCondition::IfMatch(etag),
            None => PutCondition::Unconditional,
        }
    }

    /// Non-blank lines in document order.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.content.lines().filter(|l| !l.trim().is_empty())
    }
}

/// Condition for PUT requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutCondition<'a> {
    /// If-Match: <etag>, overwrite only the revision we read.
    IfMatch(&'a str),
    /// No conditional header.
    Unconditional,
}

/// The WebDAV round trips the document store is built on.
///
/// Implementors supply the raw verbs; `ensure_directory` and
/// `write_document` layer the idempotent-create and conflict-retry policy
/// on top of them.
#[async_trait]
pub trait Dav: Send + Sync {
    /// HEAD; true unless the server answers 404.
    async fn exists(&self, url: &str) -> Result<bool, DavError>;

    /// MKCOL; the response status is returned uninspected.
    async fn make_collection(&self, url: &str) -> Result<StatusCode, DavError>;

    /// GET; a 404 is an empty, unversioned document rather than an error.
    async fn read_document(&self, url: &str) -> Result<RemoteDocument, DavError>;

    /// A single PUT carrying `condition`.
    async fn put(
        &self,
        url: &str,
        content: &str,
        condition: PutCondition<'_>,
    ) -> Result<StatusCode, DavError>;

    /// Create the collection if HEAD reports it missing.
    async fn ensure_directory(&self, url: &str) -> Result<(), DavError> {
        if self.exists(url).await? {
            return Ok(());
        }
        let status = self.make_collection(url).await?;
        log::info!("MKCOL {} returned {}", url, status);
        Ok(())
    }

    /// PUT `content`. A 412 on a conditional write is retried once without
    /// the precondition and the retry's status is returned.
    async fn write_document(
        &self,
        url: &str,
        content: &str,
        condition: PutCondition<'_>,
    ) -> Result<StatusCode, DavError> {
        let status = self.put(url, content, condition).await?;
        if status == StatusCode::PRECONDITION_FAILED
            && matches!(condition, PutCondition::IfMatch(_))
        {
            log::warn!("PUT {}: ETag mismatch, retrying unconditionally", url);
            return self.put(url, content, PutCondition::Unconditional).await;
        }
        Ok(status)
    }
}

/// WebDAV client with basic auth against a Nextcloud-style server.
#[derive(Clone)]
pub struct WebDavClient {
    username: String,
    password: String,
    http: Client,
}

impl WebDavClient {
    pub fn new(username: &str, password: &str) -> Result<Self, String> {
        let http = Client::builder()
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            http,
        })
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }
}

#[async_trait]
impl Dav for WebDavClient {
    async fn exists(&self, url: &str) -> Result<bool, DavError> {
        let resp = self
            .request(Method::HEAD, url)
            .send()
            .await
            .map_err(|source| DavError::Http {
                method: "HEAD",
                url: url.to_string(),
                source,
            })?;
        Ok(resp.status() != StatusCode::NOT_FOUND)
    }

    async fn make_collection(&self, url: &str) -> Result<StatusCode, DavError> {
        let resp = self
            .request(MKCOL.clone(), url)
            .send()
            .await
            .map_err(|source| DavError::Http {
                method: "MKCOL",
                url: url.to_string(),
                source,
            })?;
        Ok(resp.status())
    }

    async fn read_document(&self, url: &str) -> Result<RemoteDocument, DavError> {
        let resp = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|source| DavError::Http {
                method: "GET",
                url: url.to_string(),
                source,
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Ok(RemoteDocument::missing()),
            StatusCode::OK => {}
            status => {
                return Err(DavError::Status {
                    method: "GET",
                    url: url.to_string(),
                    status,
                });
            }
        }

        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = resp.bytes().await.map_err(|source| DavError::Http {
            method: "GET",
            url: url.to_string(),
            source,
        })?;

        Ok(RemoteDocument {
            found: true,
            content: decode_lossy(&bytes),
            etag,
        })
    }

    async fn put(
        &self,
        url: &str,
        content: &str,
        condition: PutCondition<'_>,
    ) -> Result<StatusCode, DavError> {
        let mut req = self
            .request(Method::PUT, url)
            .header(CONTENT_TYPE, "text/markdown; charset=utf-8")
            .body(content.to_string());

        if let PutCondition::IfMatch(etag) = condition {
            req = req.header(IF_MATCH, etag);
        }

        let resp = req.send().await.map_err(|source| DavError::Http {
            method: "PUT",
            url: url.to_string(),
            source,
        })?;
        Ok(resp.status())
    }
}

/// Decode UTF-8, dropping invalid sequences instead of replacing them.
pub(crate) fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
