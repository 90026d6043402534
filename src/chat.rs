//! Chat helpers shared by the commands

use grammers_client::types::peer::Peer;
use grammers_client::Client;
use grammers_session::defs::PeerId;

use crate::error::{Error, Result};

/// Human-readable name of a chat.
pub fn chat_title(peer: &Peer) -> String {
    let title = match peer {
        Peer::Channel(c) => c.title().to_string(),
        Peer::Group(g) => g.title().unwrap_or("Group").to_string(),
        Peer::User(u) => u.full_name(),
    };

    if title.trim().is_empty() {
        // Deleted accounts come back without a name
        format!("#{}", peer_raw_id(peer))
    } else {
        title
    }
}

fn peer_raw_id(peer: &Peer) -> i64 {
    match peer {
        Peer::Channel(c) => c.raw.id,
        Peer::Group(g) => match &g.raw {
            grammers_tl_types::enums::Chat::Empty(c) => c.id,
            grammers_tl_types::enums::Chat::Chat(c) => c.id,
            grammers_tl_types::enums::Chat::Forbidden(c) => c.id,
            grammers_tl_types::enums::Chat::Channel(c) => c.id,
            grammers_tl_types::enums::Chat::ChannelForbidden(c) => c.id,
        },
        Peer::User(u) => u.raw.id(),
    }
}

/// Find the dialog peer for `peer_id`. Only chats present in the dialog list resolve.
pub async fn find_dialog_peer(client: &Client, peer_id: PeerId) -> Result<Peer> {
    let mut dialogs = client.iter_dialogs();

    while let Some(dialog) = dialogs.next().await? {
        if dialog.peer.id() == peer_id {
            return Ok(dialog.peer.clone());
        }
    }

    Err(Error::InvalidArgument(format!(
        "chat {:?} not found in dialogs",
        peer_id
    )))
}
