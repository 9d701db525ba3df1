pub mod scheduler;

use chrono::NaiveDate;

use crate::core::entry::{DatedLine, Entry};
use crate::core::paths::GtdPaths;
use crate::sync::store::DocumentStore;
use crate::sync::webdav::{Dav, DavError};

/// Read-only weekly review: list sizes plus the newest Inbox and Waiting
/// entries.
pub async fn weekly_summary<D: Dav>(
    store: &DocumentStore<D>,
    paths: &GtdPaths,
    today: NaiveDate,
) -> Result<String, DavError> {
    let inbox = store.count_lines(&paths.inbox()).await?;
    let waiting = store.count_lines(&paths.waiting()).await?;
    let projects = store.count_lines(&paths.projects()).await?;
    let tickler = store.count_lines(&paths.tickler()).await?;
    let inbox_tail = store.read_tail(&paths.inbox(), 5).await?;
    let waiting_tail = store.read_tail(&paths.waiting(), 5).await?;

    Ok([
        format!("# Weekly Review ({})", today),
        format!("- Inbox: {}", inbox),
        format!("- Waiting: {}", waiting),
        format!("- Projects: {}", projects),
        format!("- Tickler: {}", tickler),
        String::new(),
        "**Inbox last 5:**".to_string(),
        inbox_tail,
        "**Waiting last 5:**".to_string(),
        waiting_tail,
    ]
    .join("\n"))
}

/// Move every tickler dated `today` or earlier into the Inbox.
///
/// Tickler is read once; due lines are appended to Inbox one by one, then
/// the remaining lines are written back in a single PUT guarded by the ETag
/// from that first read. Lines without a valid leading date are never due.
/// Returns the number of lines moved.
pub async fn move_due_ticklers<D: Dav>(
    store: &DocumentStore<D>,
    paths: &GtdPaths,
    today: NaiveDate,
) -> Result<usize, DavError> {
    let tickler_url = paths.tickler();
    let inbox_url = paths.inbox();

    let doc = store.read(&tickler_url).await?;
    if !doc.found {
        return Ok(0);
    }

    let mut remaining = Vec::new();
    let mut moved = 0;
    for line in doc.content.lines() {
        match DatedLine::parse(line) {
            Some(dated) if dated.is_due(today) => {
                let entry = Entry::Matured { rest: dated.rest }.render(today);
                store.append_line(&inbox_url, &entry).await?;
                moved += 1;
            }
            _ => remaining.push(line),
        }
    }

    if moved > 0 {
        store
            .replace_with_remaining(&tickler_url, &remaining, doc.put_condition())
            .await?;
        log::info!("Moved {} due ticklers to Inbox", moved);
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::memory::MemoryDav;
    use reqwest::StatusCode;

    const INBOX: &str = "https://dav/GTD/Inbox.md";
    const WAITING: &str = "https://dav/GTD/WaitingFor.md";
    const PROJECTS: &str = "https://dav/GTD/Projects.md";
    const TICKLER: &str = "https://dav/GTD/Tickler.md";

    fn paths() -> GtdPaths {
        GtdPaths::new("https://dav/GTD")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[tokio::test]
    async fn sweep_moves_yesterday_and_today_only() {
        let dav = MemoryDav::new().with_file(
            TICKLER,
            "2026-10-18 TICKLER pay rent\n\
             2026-10-19 TICKLER call dentist\n\
             2026-10-20 TICKLER renew visa\n",
        );
        let store = DocumentStore::new(dav);

        let moved = move_due_ticklers(&store, &paths(), today()).await.unwrap();
        assert_eq!(moved, 2);
        assert_eq!(
            store.dav().lines(INBOX),
            vec![
                "2026-10-19 [TICKLER] TICKLER pay rent",
                "2026-10-19 [TICKLER] TICKLER call dentist",
            ]
        );
        assert_eq!(store.dav().lines(TICKLER), vec!["2026-10-20 TICKLER renew visa"]);

        let again = move_due_ticklers(&store, &paths(), today()).await.unwrap();
        assert_eq!(again, 0);
        assert_eq!(store.dav().lines(INBOX).len(), 2);
    }

    #[tokio::test]
    async fn sweep_keeps_malformed_lines() {
        let dav = MemoryDav::new().with_file(
            TICKLER,
            "# Tickler\n2026-02-31 TICKLER impossible date\n2026-10-01 TICKLER old\nno date here\n",
        );
        let store = DocumentStore::new(dav);

        assert_eq!(move_due_ticklers(&store, &paths(), today()).await.unwrap(), 1);
        assert_eq!(
            store.dav().lines(TICKLER),
            vec!["# Tickler", "2026-02-31 TICKLER impossible date", "no date here"]
        );
    }

    #[tokio::test]
    async fn sweep_without_due_entries_does_not_write() {
        let dav = MemoryDav::new().with_file(TICKLER, "2027-01-01 TICKLER later\n");
        let store = DocumentStore::new(dav);

        assert_eq!(move_due_ticklers(&store, &paths(), today()).await.unwrap(), 0);
        assert!(store.dav().puts().is_empty());

        let empty = DocumentStore::new(MemoryDav::new());
        assert_eq!(move_due_ticklers(&empty, &paths(), today()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sweep_writes_tickler_with_version_from_first_read() {
        let dav =
            MemoryDav::new().with_file(TICKLER, "2026-10-01 TICKLER a\n2026-10-02 TICKLER b\n");
        let etag = dav.etag(TICKLER);
        let store = DocumentStore::new(dav);

        move_due_ticklers(&store, &paths(), today()).await.unwrap();

        let writes = store.dav().puts_to(TICKLER);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].if_match, etag);
        assert_eq!(store.dav().content(TICKLER).unwrap(), "");
        assert_eq!(store.dav().puts_to(INBOX).len(), 2);
    }

    #[tokio::test]
    async fn sweep_overwrites_tickler_edited_during_inbox_appends() {
        let dav =
            MemoryDav::new().with_file(TICKLER, "2026-10-01 TICKLER a\n2027-01-01 TICKLER b\n");
        let etag = dav.etag(TICKLER);
        dav.edit_after_next_read(TICKLER, "2026-10-01 TICKLER a\n2027-01-01 TICKLER b\nnew\n");
        let store = DocumentStore::new(dav);

        assert_eq!(move_due_ticklers(&store, &paths(), today()).await.unwrap(), 1);

        let writes = store.dav().puts_to(TICKLER);
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].if_match, etag);
        assert_eq!(writes[0].status, StatusCode::PRECONDITION_FAILED);
        assert_eq!(writes[1].if_match, None);
        assert_eq!(store.dav().lines(TICKLER), vec!["2027-01-01 TICKLER b"]);
        assert_eq!(store.dav().lines(INBOX), vec!["2026-10-19 [TICKLER] TICKLER a"]);
    }

    #[tokio::test]
    async fn sweep_propagates_unexpected_read_status() {
        let dav = MemoryDav::new();
        dav.fail_reads(TICKLER, StatusCode::SERVICE_UNAVAILABLE);
        let store = DocumentStore::new(dav);
        assert!(move_due_ticklers(&store, &paths(), today()).await.is_err());
    }

    #[tokio::test]
    async fn weekly_summary_layout() {
        let dav = MemoryDav::new()
            .with_file(INBOX, "i1\ni2\n\ni3\ni4\ni5\ni6\n")
            .with_file(WAITING, "w1\n")
            .with_file(PROJECTS, "p1\np2\n");
        let store = DocumentStore::new(dav);

        let summary = weekly_summary(&store, &paths(), today()).await.unwrap();
        assert_eq!(
            summary,
            "# Weekly Review (2026-10-19)\n\
             - Inbox: 6\n\
             - Waiting: 1\n\
             - Projects: 2\n\
             - Tickler: 0\n\
             \n\
             **Inbox last 5:**\n\
             i2\ni3\ni4\ni5\ni6\n\
             **Waiting last 5:**\n\
             w1"
        );
        assert!(store.dav().puts().is_empty());
    }
}
