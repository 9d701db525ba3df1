use chrono::NaiveDate;

use crate::core::entry::{clean, parse_iso_date};
use crate::core::list::ListKind;
use crate::sync::store::DEFAULT_TAIL;

pub const HELP: &str = "\
GTD capture bot. Commands:
/in <text> - capture to Inbox
/next <@context> <text> - add a next action
/wait <text> - add to Waiting For
/proj <+Project> <text> - log under a project
/tickler <YYYY-MM-DD> <text> - defer until a date
/list <inbox|wait|proj|tickler|next @context> [n] - show the last n entries
/done <inbox|wait|proj|tickler|next @context> <match...> - mark an entry done
/weekly - weekly review summary
/tickle - move due ticklers to Inbox";

/// A chat command with validated arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    In { text: String },
    Next { context: String, text: String },
    Wait { text: String },
    Proj { project: String, text: String },
    Tickler { due: NaiveDate, text: String },
    List { list: ListKind, count: usize },
    Done { list: ListKind, needle: String },
    Weekly,
    Tickle,
}

/// Reply sent instead of running a command whose arguments are malformed.
pub type Usage = &'static str;

impl Command {
    /// Parse a message. `None` for anything that is not one of our commands;
    /// `Some(Err(usage))` when the command is known but its arguments are not
    /// acceptable.
    pub fn parse(message: &str) -> Option<Result<Self, Usage>> {
        Self::parse_addressed(message, None)
    }

    /// Like [`Command::parse`], knowing this bot's username. Commands
    /// addressed in groups arrive as `/in@my_bot`; one addressed to another
    /// bot is not ours. Usernames compare case-insensitively.
    pub fn parse_addressed(message: &str, username: Option<&str>) -> Option<Result<Self, Usage>> {
        let mut tokens = message.split_whitespace();
        let head = tokens.next()?.strip_prefix('/')?;
        let (name, target) = match head.split_once('@') {
            Some((name, target)) => (name, Some(target)),
            None => (head, None),
        };
        if let (Some(target), Some(me)) = (target, username) {
            if !target.eq_ignore_ascii_case(me) {
                return None;
            }
        }
        let name = name.to_lowercase();
        let args: Vec<&str> = tokens.collect();

        let parsed = match name.as_str() {
            "start" | "help" => Ok(Self::Help),
            "in" => Self::text_only(&args, "Usage: /in <text>").map(|text| Self::In { text }),
            "wait" => Self::text_only(&args, "Usage: /wait <text>").map(|text| Self::Wait { text }),
            "next" => Self::tagged(&args, '@', "Usage: /next <@context> <text>")
                .map(|(context, text)| Self::Next { context, text }),
            "proj" => Self::tagged(&args, '+', "Usage: /proj <+Project> <text>")
                .map(|(project, text)| Self::Proj { project, text }),
            "tickler" => Self::tickler(&args),
            "list" => Self::list(&args),
            "done" => Self::done(&args),
            "weekly" => Ok(Self::Weekly),
            "tickle" => Ok(Self::Tickle),
            _ => return None,
        };
        Some(parsed)
    }

    fn text_only(args: &[&str], usage: Usage) -> Result<String, Usage> {
        let text = clean(&args.join(" "));
        if text.is_empty() { Err(usage) } else { Ok(text) }
    }

    fn tagged(args: &[&str], sigil: char, usage: Usage) -> Result<(String, String), Usage> {
        match args.split_first() {
            Some((tag, rest)) if tag.starts_with(sigil) && !rest.is_empty() => {
                Ok((tag.to_string(), clean(&rest.join(" "))))
            }
            _ => Err(usage),
        }
    }

    fn tickler(args: &[&str]) -> Result<Self, Usage> {
        let Some((date, rest)) = args.split_first().filter(|(_, rest)| !rest.is_empty()) else {
            return Err("Usage: /tickler <YYYY-MM-DD> <text>");
        };
        let due = parse_iso_date(date).ok_or("Date must be YYYY-MM-DD")?;
        Ok(Self::Tickler {
            due,
            text: clean(&rest.join(" ")),
        })
    }

    fn list(args: &[&str]) -> Result<Self, Usage> {
        if args.is_empty() {
            return Err("Usage: /list <list>");
        }
        let (list, rest) = ListKind::from_args(args).ok_or("Unknown list")?;
        let count = rest
            .first()
            .filter(|n| n.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_TAIL);
        Ok(Self::List { list, count })
    }

    fn done(args: &[&str]) -> Result<Self, Usage> {
        const USAGE: Usage = "Usage: /done <list> <match>";
        if args.len() < 2 {
            return Err(USAGE);
        }
        let (list, rest) = ListKind::from_args(args).ok_or("Bad usage")?;
        if rest.is_empty() {
            return Err(USAGE);
        }
        Ok(Self::Done {
            list,
            needle: rest.join(" "),
        })
    }
}
