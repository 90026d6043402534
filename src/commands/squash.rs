//! Squash listener command
//!
//! Waits for the account's own `!squash N` messages. The N messages sent
//! before the command are merged into the oldest one, the others are deleted
//! together with the command itself.

use std::sync::LazyLock;

use grammers_client::client::UpdatesConfiguration;
use grammers_client::types::peer::Peer;
use grammers_client::types::update::Update;
use grammers_client::types::Message;
use grammers_client::Client;
use regex::Regex;
use tokio::signal;
use tracing::{debug, error, info, warn};

use crate::auth::StdinPrompt;
use crate::chat::{chat_title, find_dialog_peer};
use crate::commands::drafts::DraftSource;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::{get_client, SessionLock};

/// How many older messages are inspected while looking for our own ones.
pub const MAX_SCANNED: usize = 1000;

static SQUASH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!squash (\d+)").expect("valid squash pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquashCommand {
    pub count: usize,
}

/// Parse a `!squash N` command. Anything after the number is ignored.
pub fn parse_command(text: &str) -> Option<SquashCommand> {
    let captures = SQUASH_PATTERN.captures(text)?;
    // Absurd counts are bounded by MAX_SCANNED anyway
    let count = captures[1].parse::<usize>().unwrap_or(usize::MAX);
    Some(SquashCommand { count })
}

/// A message we sent, reduced to what squashing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnMessage {
    pub id: i32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquashPlan {
    pub target_id: i32,
    pub combined: String,
    /// False when the merge would leave the oldest message unchanged.
    pub edit_needed: bool,
    pub delete_ids: Vec<i32>,
    pub squashed: usize,
}

impl SquashPlan {
    /// Build a plan from messages in newest-first order, as the history
    /// iterator yields them. Returns None when there is nothing to squash.
    pub fn build(mut newest_first: Vec<OwnMessage>) -> Option<Self> {
        if newest_first.is_empty() {
            return None;
        }

        newest_first.reverse();
        let messages = newest_first;

        let combined = messages
            .iter()
            .map(|m| m.text.as_str())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let target = &messages[0];
        let edit_needed = !combined.is_empty() && combined != target.text;

        Some(Self {
            target_id: target.id,
            edit_needed,
            combined,
            delete_ids: messages[1..].iter().map(|m| m.id).collect(),
            squashed: messages.len(),
        })
    }
}

pub async fn run(config: &Config) -> Result<()> {
    let _lock = SessionLock::acquire(&config.lock_file)?;

    let mut client = get_client(config).await?;
    let mut prompt = StdinPrompt::new(config.phone.clone());
    client.authorize(&mut prompt).await?;

    let updates_rx = client
        .take_updates()
        .ok_or_else(|| Error::TelegramError("Updates stream already taken".into()))?;

    let mut updates = client.stream_updates(
        updates_rx,
        UpdatesConfiguration {
            catch_up: false,
            ..Default::default()
        },
    );

    println!("Connected! Listening for squash commands...");
    println!("Usage: Send '!squash n' in any chat to merge your last n messages.");

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("stopping squash listener");
                break;
            }
            update = updates.next() => {
                match update {
                    Ok(Update::NewMessage(msg)) if msg.outgoing() => {
                        let Some(command) = parse_command(msg.text()) else {
                            continue;
                        };
                        if let Err(err) = handle_command(&client, &msg, command).await {
                            error!("Error during squash: {}", err);
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        error!("Failed to receive updates: {}", err);
                        updates.sync_update_state();
                        return Err(Error::ConnectionError(err.to_string()));
                    }
                }
            }
        }
    }

    updates.sync_update_state();
    Ok(())
}

async fn handle_command(client: &Client, command_msg: &Message, command: SquashCommand) -> Result<()> {
    let peer = find_dialog_peer(client, command_msg.peer_id()).await?;

    if command.count < 1 {
        client.delete_messages(&peer, &[command_msg.id()]).await?;
        return Ok(());
    }

    println!(
        "Squashing last {} messages in {}...",
        command.count,
        chat_title(&peer)
    );

    let messages = collect_own_messages(client, &peer, command_msg.id(), command.count).await?;

    let Some(plan) = SquashPlan::build(messages) else {
        println!("No messages found to squash.");
        client.delete_messages(&peer, &[command_msg.id()]).await?;
        return Ok(());
    };

    if plan.edit_needed {
        client
            .edit_message(&peer, plan.target_id, plan.combined.as_str())
            .await?;
    }

    let mut delete_ids = plan.delete_ids.clone();
    delete_ids.push(command_msg.id());
    let deleted = client.delete_messages(&peer, &delete_ids).await?;
    debug!(deleted, "squash cleanup done");

    println!("Successfully squashed {} messages.", plan.squashed);
    Ok(())
}

/// Our own messages older than `before_id`, newest first, at most `limit`.
async fn collect_own_messages(
    client: &Client,
    peer: &Peer,
    before_id: i32,
    limit: usize,
) -> Result<Vec<OwnMessage>> {
    let mut collected = Vec::new();
    let mut scanned = 0;
    let mut iter = client.iter_messages(peer).offset_id(before_id);

    while let Some(msg) = iter.next().await? {
        scanned += 1;
        if msg.outgoing() {
            collected.push(OwnMessage {
                id: msg.id(),
                text: msg.text().to_string(),
            });
            if collected.len() >= limit {
                break;
            }
        }
        if scanned >= MAX_SCANNED {
            warn!(scanned, found = collected.len(), "stopped looking for older messages");
            break;
        }
    }

    Ok(collected)
}
