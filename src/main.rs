use std::sync::Arc;

use teloxide::prelude::*;

use gtd_bot::bot::handler::{GtdBot, handle_message};
use gtd_bot::config::BotConfig;
use gtd_bot::core::paths::GtdPaths;
use gtd_bot::jobs::scheduler::{Schedule, start_scheduler};
use gtd_bot::sync::store::DocumentStore;
use gtd_bot::sync::webdav::WebDavClient;

const CRATE_TARGET: &str = "gtd_bot";

fn crate_level() -> log::LevelFilter {
    if gtd_bot::debug_logging() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Log to the systemd journal when running under systemd
/// (`journalctl -t gtd-bot -f`), otherwise to stderr.
/// This crate logs at info/debug (per config), everything else at warn.
fn init_logging(debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    gtd_bot::set_debug_logging(debug);

    if systemd_journal_logger::connected_to_journal() {
        struct FilteredJournal {
            inner: systemd_journal_logger::JournalLog,
        }

        impl log::Log for FilteredJournal {
            fn enabled(&self, metadata: &log::Metadata) -> bool {
                if metadata.target().starts_with(CRATE_TARGET) {
                    metadata.level() <= crate_level()
                } else {
                    metadata.level() <= log::LevelFilter::Warn
                }
            }
            fn log(&self, record: &log::Record) {
                if log::Log::enabled(self, record.metadata()) {
                    log::Log::log(&self.inner, record);
                }
            }
            fn flush(&self) {
                log::Log::flush(&self.inner);
            }
        }

        let journal = systemd_journal_logger::JournalLog::new()?
            .with_syslog_identifier("gtd-bot".to_string());
        log::set_boxed_logger(Box::new(FilteredJournal { inner: journal }))?;
        // Global max must be Debug so crate debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Warn)
            .filter_module(CRATE_TARGET, crate_level())
            .parse_default_env()
            .try_init()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BotConfig::load()?;
    init_logging(config.debug_logging)?;

    if config.allowed_chat.is_none() {
        log::warn!("TELEGRAM_ALLOWED_CHAT is not set; accepting commands from any chat");
    }

    let client = WebDavClient::new(&config.username, &config.password)?;
    let paths = GtdPaths::from_config(&config);
    match paths.ensure_structure(&client).await {
        Ok(()) => log::info!("GTD folder ready at {}", paths.root()),
        Err(e) => log::error!("Could not prepare GTD folder {}: {}", paths.root(), e),
    }

    let bot = Bot::new(config.telegram_token.clone());
    let mut gtd = GtdBot::new(paths, DocumentStore::new(client), config.allowed_chat);
    match bot.get_me().await {
        Ok(me) => {
            log::info!("Running as @{}", me.username());
            gtd = gtd.with_username(me.username());
        }
        Err(e) => log::warn!("Could not look up bot username, accepting any /cmd@name: {}", e),
    }
    let gtd = Arc::new(gtd);

    start_scheduler(bot.clone(), gtd.clone(), Schedule::from_config(&config));

    log::info!("Starting bot...");
    let handler = Update::filter_message().endpoint(handle_message);
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![gtd])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
