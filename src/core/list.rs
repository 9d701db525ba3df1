use super::paths::GtdPaths;

/// A list a `/list` or `/done` command can target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKind {
    Inbox,
    Waiting,
    Projects,
    Tickler,
    /// Next actions for a context, stored as given (e.g. `@home`).
    Next(String),
}

impl ListKind {
    /// Fixed lists by keyword, case-insensitive. `next` needs a context and
    /// is resolved by [`ListKind::from_args`].
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "inbox" => Some(Self::Inbox),
            "wait" | "waiting" => Some(Self::Waiting),
            "proj" | "projects" => Some(Self::Projects),
            "tickler" | "tick" => Some(Self::Tickler),
            _ => None,
        }
    }

    /// Parse the leading list selector from command arguments, returning the
    /// list and the arguments that follow it.
    pub fn from_args<'a, 'b>(args: &'b [&'a str]) -> Option<(Self, &'b [&'a str])> {
        let (first, rest) = args.split_first()?;
        if first.eq_ignore_ascii_case("next") {
            let (context, rest) = rest.split_first()?;
            if !context.starts_with('@') {
                return None;
            }
            return Some((Self::Next(context.to_string()), rest));
        }
        Self::from_keyword(first).map(|kind| (kind, rest))
    }

    pub fn url(&self, paths: &GtdPaths) -> String {
        match self {
            Self::Inbox => paths.inbox(),
            Self::Waiting => paths.waiting(),
            Self::Projects => paths.projects(),
            Self::Tickler => paths.tickler(),
            Self::Next(context) => paths.next(context),
        }
    }
}
