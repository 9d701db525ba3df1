//! Timers for the daily tickler sweep and the weekly review push.

use std::sync::Arc;

use chrono::{Datelike, Days, Local, NaiveDateTime, NaiveTime, Weekday};
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::task::JoinHandle;

use crate::bot::handler::{GtdBot, send_reply};
use crate::config::{BotConfig, WeeklyPush};
use crate::sync::webdav::WebDavClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    TicklerSweep,
    WeeklyPush,
}

/// When each job runs, in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub tickler_hour: u32,
    pub weekly: Option<WeeklyPush>,
}

impl Schedule {
    /// The weekly push only makes sense with a chat to push to.
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            tickler_hour: config.tickler_run_hour,
            weekly: config.weekly_push.filter(|_| config.allowed_chat.is_some()),
        }
    }

    /// The earliest upcoming run strictly after `now`, and every job due at
    /// that instant.
    pub fn next_run(&self, now: NaiveDateTime) -> (NaiveDateTime, Vec<Job>) {
        let mut at = next_daily(now, self.tickler_hour);
        let mut jobs = vec![Job::TicklerSweep];

        if let Some(weekly) = self.weekly {
            let weekly_at = next_weekly(now, weekly.weekday, weekly.hour);
            if weekly_at < at {
                at = weekly_at;
                jobs.clear();
            }
            if weekly_at == at {
                jobs.push(Job::WeeklyPush);
            }
        }
        (at, jobs)
    }
}

fn at_hour(date: chrono::NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default())
}

/// Next `hour:00` strictly after `now`.
pub fn next_daily(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let candidate = at_hour(now.date(), hour);
    if candidate > now {
        candidate
    } else {
        candidate + Days::new(1)
    }
}

/// Next `weekday hour:00` strictly after `now`.
pub fn next_weekly(now: NaiveDateTime, weekday: Weekday, hour: u32) -> NaiveDateTime {
    let ahead = (7 + weekday.num_days_from_monday() - now.weekday().num_days_from_monday()) % 7;
    let candidate = at_hour(now.date() + Days::new(u64::from(ahead)), hour);
    if candidate > now {
        candidate
    } else {
        candidate + Days::new(7)
    }
}

/// Spawn the scheduler loop on the current runtime.
pub fn start_scheduler(
    bot: Bot,
    gtd: Arc<GtdBot<WebDavClient>>,
    schedule: Schedule,
) -> JoinHandle<()> {
    log::info!(
        "Scheduler: tickler sweep daily at {:02}:00, weekly push {}",
        schedule.tickler_hour,
        match schedule.weekly {
            Some(w) => format!("{} at {:02}:00", w.weekday, w.hour),
            None => "disabled".to_string(),
        }
    );
    tokio::spawn(scheduler_loop(bot, gtd, schedule))
}

async fn scheduler_loop(bot: Bot, gtd: Arc<GtdBot<WebDavClient>>, schedule: Schedule) {
    let mut last_run: Option<NaiveDateTime> = None;
    loop {
        let now = Local::now().naive_local();
        // Never schedule at or before the previous run, even if the wall
        // clock woke us slightly early.
        let from = last_run.map_or(now, |last| last.max(now));
        let (at, jobs) = schedule.next_run(from);

        let wait = (at - now).to_std().unwrap_or_default();
        log::debug!("Next scheduled run at {} ({:?}): {:?}", at, wait, jobs);
        tokio::time::sleep(wait).await;

        for job in jobs {
            run_job(&bot, &gtd, job).await;
        }
        last_run = Some(at);
    }
}

async fn run_job(bot: &Bot, gtd: &GtdBot<WebDavClient>, job: Job) {
    let today = Local::now().date_naive();
    match job {
        Job::TicklerSweep => {
            match super::move_due_ticklers(gtd.store(), gtd.paths(), today).await {
                Ok(moved) => {
                    log::info!("Scheduled tickler sweep moved {}", moved);
                    if moved > 0 {
                        notify(bot, gtd, &format!("Moved {} ticklers", moved)).await;
                    }
                }
                Err(e) => log::error!("Scheduled tickler sweep failed: {}", e),
            }
        }
        Job::WeeklyPush => match super::weekly_summary(gtd.store(), gtd.paths(), today).await {
            Ok(summary) => notify(bot, gtd, &summary).await,
            Err(e) => log::error!("Weekly summary failed: {}", e),
        },
    }
}

async fn notify(bot: &Bot, gtd: &GtdBot<WebDavClient>, text: &str) {
    let Some(chat) = gtd.allowed_chat() else {
        return;
    };
    if let Err(e) = send_reply(bot, ChatId(chat), text).await {
        log::warn!("Failed to notify chat {}: {}", chat, e);
    }
}
