use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static DATED_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<date>\d{4}-\d{2}-\d{2}) (?P<rest>.+)$").unwrap()
});

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn clean(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Strict `YYYY-MM-DD` that is also a real calendar date.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if !ISO_DATE_RE.is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// A stored line split into its leading date and the remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedLine<'a> {
    pub date: NaiveDate,
    pub rest: &'a str,
}

impl<'a> DatedLine<'a> {
    /// `None` when the line does not start with `DATE ` or the date is not
    /// a real day.
    pub fn parse(line: &'a str) -> Option<Self> {
        let caps = DATED_LINE_RE.captures(line)?;
        let date = NaiveDate::parse_from_str(&caps["date"], "%Y-%m-%d").ok()?;
        let rest = caps.name("rest")?.as_str();
        Some(Self { date, rest })
    }

    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.date <= today
    }
}

/// One line to be written to a GTD list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry<'a> {
    Inbox { text: &'a str },
    Next { context: &'a str, text: &'a str },
    Waiting { text: &'a str },
    Project { project: &'a str, text: &'a str },
    Tickler { due: NaiveDate, text: &'a str },
    /// A tickler that came due and moved to the inbox.
    Matured { rest: &'a str },
    Done { original: &'a str },
}

impl Entry<'_> {
    /// Render the stored line. `today` stamps every kind except `Tickler`,
    /// which carries its own due date.
    pub fn render(&self, today: NaiveDate) -> String {
        match self {
            Self::Inbox { text } => format!("{} {}", today, text),
            Self::Next { context, text } => format!("{} {} {}", today, text, context),
            Self::Waiting { text } => format!("{} WAITING {}", today, text),
            Self::Project { project, text } => format!("{} {} :: {}", today, project, text),
            Self::Tickler { due, text } => format!("{} TICKLER {}", due, text),
            Self::Matured { rest } => format!("{} [TICKLER] {}", today, rest),
            Self::Done { original } => format!("{} DONE ~~{}~~", today, original),
        }
    }
}
