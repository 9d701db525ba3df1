use reqwest::StatusCode;

use super::webdav::{Dav, DavError, PutCondition, RemoteDocument};

/// Placeholder for a list with no entries.
pub const EMPTY: &str = "(empty)";

pub const DEFAULT_TAIL: usize = 10;

/// Line-oriented access to Markdown documents on WebDAV.
///
/// Every operation is a full read-modify-write: fetch the document, edit the
/// lines, and write the result back guarded by the ETag from that same read.
pub struct DocumentStore<D> {
    dav: D,
}

impl<D: Dav> DocumentStore<D> {
    pub fn new(dav: D) -> Self {
        Self { dav }
    }

    pub fn dav(&self) -> &D {
        &self.dav
    }

    pub async fn read(&self, url: &str) -> Result<RemoteDocument, DavError> {
        self.dav.read_document(url).await
    }

    /// Append one line, creating the document if it does not exist yet.
    pub async fn append_line(&self, url: &str, line: &str) -> Result<(), DavError> {
        let doc = self.dav.read_document(url).await?;
        let mut content = doc.content.clone();
        content.push_str(line.trim_end());
        content.push('\n');

        let status = self
            .dav
            .write_document(url, &content, doc.put_condition())
            .await?;
        ensure_written(url, status)?;
        log::debug!("Appended to {}: {}", url, line);
        Ok(())
    }

    /// Last `n` non-blank lines joined by newlines.
    ///
    /// An unexpected read status is rendered inline as `Error <code>`.
    pub async fn read_tail(&self, url: &str, n: usize) -> Result<String, DavError> {
        let doc = match self.dav.read_document(url).await {
            Ok(doc) => doc,
            Err(DavError::Status { status, .. }) => {
                return Ok(format!("Error {}", status.as_u16()));
            }
            Err(e) => return Err(e),
        };

        let lines: Vec<&str> = doc.entries().collect();
        if lines.is_empty() {
            return Ok(EMPTY.to_string());
        }
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].join("\n"))
    }

    /// Number of non-blank lines; 0 when the document cannot be read.
    pub async fn count_lines(&self, url: &str) -> Result<usize, DavError> {
        match self.dav.read_document(url).await {
            Ok(doc) => Ok(doc.entries().count()),
            Err(DavError::Status { status, .. }) => {
                log::warn!("Counting {}: GET returned {}", url, status);
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    /// Remove the first line containing `needle` (case-insensitive) and
    /// return it as stored.
    pub async fn remove_first_matching(
        &self,
        url: &str,
        needle: &str,
    ) -> Result<Option<String>, DavError> {
        let doc = match self.dav.read_document(url).await {
            Ok(doc) if doc.found => doc,
            Ok(_) => return Ok(None),
            Err(DavError::Status { status, .. }) => {
                log::warn!("Removing from {}: GET returned {}", url, status);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let needle = needle.to_lowercase();
        let mut lines: Vec<&str> = doc.content.lines().collect();
        let Some(index) = lines
            .iter()
            .position(|line| line.to_lowercase().contains(&needle))
        else {
            return Ok(None);
        };
        let removed = lines.remove(index).to_string();

        let status = self
            .dav
            .write_document(url, &join_lines(&lines), doc.put_condition())
            .await?;
        ensure_written(url, status)?;
        log::debug!("Removed from {}: {}", url, removed);
        Ok(Some(removed))
    }

    /// Overwrite a document with `lines`, guarded by a version captured
    /// earlier by the caller.
    pub async fn replace_with_remaining(
        &self,
        url: &str,
        lines: &[&str],
        condition: PutCondition<'_>,
    ) -> Result<StatusCode, DavError> {
        let status = self
            .dav
            .write_document(url, &join_lines(lines), condition)
            .await?;
        ensure_written(url, status)?;
        Ok(status)
    }
}

fn join_lines(lines: &[&str]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn ensure_written(url: &str, status: StatusCode) -> Result<(), DavError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(DavError::Status {
            method: "PUT",
            url: url.to_string(),
            status,
        })
    }
}
