use regex::Regex;
use std::sync::LazyLock;

use crate::config::BotConfig;
use crate::sync::webdav::{Dav, DavError};

static UNSAFE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9_-]+").unwrap());

/// File-name token for a context: one leading `@` stripped, lowercased,
/// runs outside `[a-z0-9_-]` replaced by `_`.
pub fn context_token(context: &str) -> String {
    let lowered = context.strip_prefix('@').unwrap_or(context).to_lowercase();
    UNSAFE_RUN_RE.replace_all(&lowered, "_").into_owned()
}

/// Remote locations of the GTD documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GtdPaths {
    root: String,
}

impl GtdPaths {
    /// `root_url` is the GTD folder itself, without a trailing slash.
    pub fn new(root_url: &str) -> Self {
        Self {
            root: root_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(&config.gtd_root_url())
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn md(&self, name: &str) -> String {
        format!("{}/{}.md", self.root, name)
    }

    pub fn inbox(&self) -> String {
        self.md("Inbox")
    }

    pub fn waiting(&self) -> String {
        self.md("WaitingFor")
    }

    pub fn projects(&self) -> String {
        self.md("Projects")
    }

    pub fn tickler(&self) -> String {
        self.md("Tickler")
    }

    pub fn done(&self) -> String {
        self.md("Done")
    }

    pub fn next_dir(&self) -> String {
        format!("{}/Next", self.root)
    }

    pub fn next(&self, context: &str) -> String {
        format!("{}/@{}.md", self.next_dir(), context_token(context))
    }

    /// Ensure the root folder and its `Next` subfolder exist.
    pub async fn ensure_structure<D: Dav + ?Sized>(&self, dav: &D) -> Result<(), DavError> {
        dav.ensure_directory(&self.root).await?;
        dav.ensure_directory(&self.next_dir()).await?;
        Ok(())
    }
}
