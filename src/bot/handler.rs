use std::sync::Arc;

use chrono::NaiveDate;
use teloxide::prelude::*;
use teloxide::types::ChatId;

use super::command::{Command, HELP};
use crate::core::entry::Entry;
use crate::core::paths::GtdPaths;
use crate::jobs;
use crate::sync::store::DocumentStore;
use crate::sync::webdav::{Dav, DavError, WebDavClient};

pub const NOT_AUTHORIZED: &str = "Not authorized";

/// Telegram caps a message at 4096 UTF-16 code units; stay well clear.
const MAX_MESSAGE_UNITS: usize = 4000;

/// Everything a command needs: where the lists live, how to reach them, and
/// who may use them.
pub struct GtdBot<D> {
    paths: GtdPaths,
    store: DocumentStore<D>,
    allowed_chat: Option<i64>,
    username: Option<String>,
}

impl<D: Dav> GtdBot<D> {
    pub fn new(paths: GtdPaths, store: DocumentStore<D>, allowed_chat: Option<i64>) -> Self {
        Self {
            paths,
            store,
            allowed_chat,
            username: None,
        }
    }

    /// Only answer `/cmd@name` suffixes naming this bot.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn paths(&self) -> &GtdPaths {
        &self.paths
    }

    pub fn store(&self) -> &DocumentStore<D> {
        &self.store
    }

    pub fn allowed_chat(&self) -> Option<i64> {
        self.allowed_chat
    }

    pub fn is_authorized(&self, chat_id: i64) -> bool {
        self.allowed_chat.is_none_or(|allowed| allowed == chat_id)
    }

    /// Reply for a message from `chat_id`, or `None` if the message is not a
    /// command this bot handles.
    pub async fn respond(&self, chat_id: i64, message: &str, today: NaiveDate) -> Option<String> {
        let parsed = Command::parse_addressed(message, self.username.as_deref())?;

        if !self.is_authorized(chat_id) {
            log::warn!("Rejected command from chat {}", chat_id);
            return Some(NOT_AUTHORIZED.to_string());
        }

        let command = match parsed {
            Ok(command) => command,
            Err(usage) => return Some(usage.to_string()),
        };

        log::debug!("Chat {}: {:?}", chat_id, command);
        match self.execute(command, today).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                log::error!("Command from chat {} failed: {}", chat_id, e);
                Some(format!("Error: {}", e))
            }
        }
    }

    /// Run a validated command against the store.
    pub async fn execute(&self, command: Command, today: NaiveDate) -> Result<String, DavError> {
        let paths = &self.paths;
        match command {
            Command::Help => Ok(HELP.to_string()),
            Command::In { text } => {
                let line = Entry::Inbox { text: &text }.render(today);
                self.store.append_line(&paths.inbox(), &line).await?;
                Ok("Captured to Inbox.".to_string())
            }
            Command::Next { context, text } => {
                let line = Entry::Next {
                    context: &context,
                    text: &text,
                }
                .render(today);
                self.store.append_line(&paths.next(&context), &line).await?;
                Ok(format!("Added to Next {}.", context))
            }
            Command::Wait { text } => {
                let line = Entry::Waiting { text: &text }.render(today);
                self.store.append_line(&paths.waiting(), &line).await?;
                Ok("Added to Waiting For.".to_string())
            }
            Command::Proj { project, text } => {
                let line = Entry::Project {
                    project: &project,
                    text: &text,
                }
                .render(today);
                self.store.append_line(&paths.projects(), &line).await?;
                Ok(format!("Logged under {}.", project))
            }
            Command::Tickler { due, text } => {
                let line = Entry::Tickler { due, text: &text }.render(today);
                self.store.append_line(&paths.tickler(), &line).await?;
                Ok("Added to Tickler.".to_string())
            }
            Command::List { list, count } => self.store.read_tail(&list.url(paths), count).await,
            Command::Done { list, needle } => {
                let url = list.url(paths);
                let Some(removed) = self.store.remove_first_matching(&url, &needle).await? else {
                    return Ok("Not found".to_string());
                };
                let line = Entry::Done { original: &removed }.render(today);
                self.store.append_line(&paths.done(), &line).await?;
                Ok("Marked done.".to_string())
            }
            Command::Weekly => jobs::weekly_summary(&self.store, paths, today).await,
            Command::Tickle => {
                let moved = jobs::move_due_ticklers(&self.store, paths, today).await?;
                Ok(format!("Moved {} ticklers", moved))
            }
        }
    }
}

fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Byte index of the longest prefix of `line` that fits in `max` UTF-16
/// units, never splitting a character.
fn utf16_cut(line: &str, max: usize) -> usize {
    let mut units = 0;
    for (i, c) in line.char_indices() {
        units += c.len_utf16();
        if units > max {
            return i;
        }
    }
    line.len()
}

/// Split a reply into Telegram-sized messages on line boundaries.
///
/// Sizes are measured in UTF-16 code units, as Telegram counts them.
pub fn split_message(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_units = 0;
    for line in text.split('\n') {
        let mut line = line;
        while utf16_len(line) > MAX_MESSAGE_UNITS {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_units = 0;
            }
            let cut = utf16_cut(line, MAX_MESSAGE_UNITS);
            chunks.push(line[..cut].to_string());
            line = &line[cut..];
        }
        let line_units = utf16_len(line);
        let needed = usize::from(!current.is_empty()) + line_units;
        if current_units + needed > MAX_MESSAGE_UNITS {
            chunks.push(std::mem::take(&mut current));
            current_units = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_units += 1;
        }
        current.push_str(line);
        current_units += line_units;
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Send a possibly long reply as one or more messages.
pub async fn send_reply(bot: &Bot, chat_id: ChatId, text: &str) -> ResponseResult<()> {
    for chunk in split_message(text) {
        bot.send_message(chat_id, chunk).await?;
    }
    Ok(())
}

/// Dispatcher endpoint for text messages.
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    gtd: Arc<GtdBot<WebDavClient>>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let today = chrono::Local::now().date_naive();
    if let Some(reply) = gtd.respond(msg.chat.id.0, text, today).await {
        send_reply(&bot, msg.chat.id, &reply).await?;
    }
    Ok(())
}
