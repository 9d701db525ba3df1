//! In-memory WebDAV double for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::webdav::{Dav, DavError, PutCondition, RemoteDocument};

/// One PUT as the server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    pub url: String,
    pub if_match: Option<String>,
    pub status: StatusCode,
}

#[derive(Default)]
struct State {
    files: HashMap<String, (String, u64)>,
    dirs: HashSet<String>,
    read_failures: HashMap<String, StatusCode>,
    put_failures: HashMap<String, StatusCode>,
    edits_after_read: HashMap<String, String>,
    puts: Vec<PutRecord>,
    gets: usize,
    revision: u64,
}

/// Files keyed by URL, versioned by a counter rendered as a quoted ETag.
#[derive(Default)]
pub struct MemoryDav {
    state: Mutex<State>,
}

fn etag_for(rev: u64) -> String {
    format!("\"rev-{}\"", rev)
}

impl MemoryDav {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, url: &str, content: &str) -> Self {
        self.set(url, content);
        self
    }

    /// Replace a file's content out of band, as another client would.
    pub fn set(&self, url: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        state.revision += 1;
        let rev = state.revision;
        state.files.insert(url.to_string(), (content.to_string(), rev));
    }

    pub fn content(&self, url: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.files.get(url).map(|(c, _)| c.clone())
    }

    pub fn lines(&self, url: &str) -> Vec<String> {
        self.content(url)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn etag(&self, url: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.files.get(url).map(|(_, rev)| etag_for(*rev))
    }

    pub fn has_dir(&self, url: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(url)
    }

    pub fn fail_reads(&self, url: &str, status: StatusCode) {
        let mut state = self.state.lock().unwrap();
        state.read_failures.insert(url.to_string(), status);
    }

    pub fn fail_puts(&self, url: &str, status: StatusCode) {
        let mut state = self.state.lock().unwrap();
        state.put_failures.insert(url.to_string(), status);
    }

    /// Replace the file with `content` right after its next successful
    /// read, so the reader's ETag is already stale when it writes back.
    pub fn edit_after_next_read(&self, url: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .edits_after_read
            .insert(url.to_string(), content.to_string());
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.state.lock().unwrap().puts.clone()
    }

    pub fn puts_to(&self, url: &str) -> Vec<PutRecord> {
        self.puts().into_iter().filter(|p| p.url == url).collect()
    }

    pub fn request_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.gets + state.puts.len()
    }
}

#[async_trait]
impl Dav for MemoryDav {
    async fn exists(&self, url: &str) -> Result<bool, DavError> {
        let state = self.state.lock().unwrap();
        Ok(state.dirs.contains(url) || state.files.contains_key(url))
    }

    async fn make_collection(&self, url: &str) -> Result<StatusCode, DavError> {
        let mut state = self.state.lock().unwrap();
        if state.dirs.insert(url.to_string()) {
            Ok(StatusCode::CREATED)
        } else {
            Ok(StatusCode::METHOD_NOT_ALLOWED)
        }
    }

    async fn read_document(&self, url: &str) -> Result<RemoteDocument, DavError> {
        let mut state = self.state.lock().unwrap();
        state.gets += 1;
        if let Some(status) = state.read_failures.get(url) {
            return Err(DavError::Status {
                method: "GET",
                url: url.to_string(),
                status: *status,
            });
        }
        let doc = match state.files.get(url) {
            Some((content, rev)) => RemoteDocument {
                found: true,
                content: content.clone(),
                etag: Some(etag_for(*rev)),
            },
            None => RemoteDocument::missing(),
        };
        if let Some(content) = state.edits_after_read.remove(url) {
            state.revision += 1;
            let rev = state.revision;
            state.files.insert(url.to_string(), (content, rev));
        }
        Ok(doc)
    }

    async fn put(
        &self,
        url: &str,
        content: &str,
        condition: PutCondition<'_>,
    ) -> Result<StatusCode, DavError> {
        let mut state = self.state.lock().unwrap();
        let current = state.files.get(url).map(|(_, rev)| etag_for(*rev));

        let status = if let Some(status) = state.put_failures.get(url) {
            *status
        } else {
            match condition {
                PutCondition::IfMatch(etag) if current.as_deref() != Some(etag) => {
                    StatusCode::PRECONDITION_FAILED
                }
                _ => {
                    state.revision += 1;
                    let rev = state.revision;
                    state.files.insert(url.to_string(), (content.to_string(), rev));
                    if current.is_some() {
                        StatusCode::NO_CONTENT
                    } else {
                        StatusCode::CREATED
                    }
                }
            }
        };

        let if_match = match condition {
            PutCondition::IfMatch(etag) => Some(etag.to_string()),
            PutCondition::Unconditional => None,
        };
        state.puts.push(PutRecord {
            url: url.to_string(),
            if_match,
            status,
        });
        Ok(status)
    }
}
