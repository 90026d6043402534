//! Draft scanner command
//!
//! Walks the account's dialog list once and prints every conversation that
//! holds an unsent draft, as `title: draft text`.

use std::io::{self, Write};

use grammers_client::types::Dialog;
use grammers_tl_types as tl;
use tracing::info;

use crate::auth::{ensure_authorized, GrammersLogin, LoginPrompt, StdinPrompt};
use crate::chat::chat_title;
use crate::config::Config;
use crate::error::Result;
use crate::session::{get_client, SessionLock, TelegramClient};

/// One dialog as seen by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub title: String,
    pub draft: Option<String>,
}

impl ConversationSummary {
    pub fn new(title: impl Into<String>, draft: Option<&str>) -> Self {
        Self {
            title: title.into(),
            draft: draft.map(str::to_string),
        }
    }

    pub fn from_dialog(dialog: &Dialog) -> Self {
        Self {
            title: chat_title(&dialog.peer),
            draft: draft_text(&dialog.raw),
        }
    }
}

/// A conversation with a non-empty draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftEntry {
    pub title: String,
    pub text: String,
}

fn draft_text(raw: &tl::enums::Dialog) -> Option<String> {
    match raw {
        tl::enums::Dialog::Dialog(d) => match &d.draft {
            Some(tl::enums::DraftMessage::Message(draft)) => Some(draft.message.clone()),
            Some(tl::enums::DraftMessage::Empty(_)) | None => None,
        },
        tl::enums::Dialog::Folder(_) => None,
    }
}

/// Where conversations come from: an authorized Telegram account, or a fake in tests.
#[allow(async_fn_in_trait)]
pub trait DraftSource {
    async fn authorize<P: LoginPrompt + ?Sized>(&mut self, prompt: &mut P) -> Result<()>;
    async fn conversations(&mut self) -> Result<Vec<ConversationSummary>>;
}

impl DraftSource for TelegramClient {
    async fn authorize<P: LoginPrompt + ?Sized>(&mut self, prompt: &mut P) -> Result<()> {
        let api_hash = self.config().api_hash.clone();
        let mut login = GrammersLogin::new(&self.client, &api_hash);
        ensure_authorized(&mut login, prompt).await
    }

    async fn conversations(&mut self) -> Result<Vec<ConversationSummary>> {
        let mut summaries = Vec::new();
        let mut dialogs = self.client.iter_dialogs();

        while let Some(dialog) = dialogs.next().await? {
            summaries.push(ConversationSummary::from_dialog(&dialog));
        }

        Ok(summaries)
    }
}

/// Keep the conversations whose draft is present and non-empty, in order.
pub fn filter_drafts<I>(summaries: I) -> Vec<DraftEntry>
where
    I: IntoIterator<Item = ConversationSummary>,
{
    summaries
        .into_iter()
        .filter_map(|summary| match summary.draft {
            Some(text) if !text.is_empty() => Some(DraftEntry {
                title: summary.title,
                text,
            }),
            _ => None,
        })
        .collect()
}

pub fn write_drafts<W: Write>(out: &mut W, entries: &[DraftEntry]) -> Result<()> {
    for entry in entries {
        writeln!(out, "{}: {}", entry.title, entry.text)?;
    }
    out.flush()?;
    Ok(())
}

/// Authorize, enumerate, filter and print. Returns the number of drafts printed.
///
/// Nothing is enumerated when authorization fails.
pub async fn scan<S, P, W>(source: &mut S, prompt: &mut P, out: &mut W) -> Result<usize>
where
    S: DraftSource,
    P: LoginPrompt + ?Sized,
    W: Write,
{
    source.authorize(prompt).await?;

    let summaries = source.conversations().await?;
    let total = summaries.len();
    let drafts = filter_drafts(summaries);

    write_drafts(out, &drafts)?;
    info!(dialogs = total, drafts = drafts.len(), "draft scan finished");

    Ok(drafts.len())
}

pub async fn run(config: &Config) -> Result<usize> {
    let _lock = SessionLock::acquire(&config.lock_file)?;

    let mut client = get_client(config).await?;
    let mut prompt = StdinPrompt::new(config.phone.clone());
    let mut out = io::stdout();

    scan(&mut client, &mut prompt, &mut out).await
}
