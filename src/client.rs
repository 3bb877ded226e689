use std::net::SocketAddr;

use tokio::net::tcp::OwnedWriteHalf;

use crate::protocol::Item;

/// Opaque per-connection identifier. Generated on accept, never reused —
/// stands in for the raw socket handle the original C server keyed clients
/// by, since ownership of the socket itself lives in the async runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// One connected socket and all state meaningful while it is or isn't in a
/// match.
///
/// There is deliberately no separate "mode" enum: what a completed line
/// means is entirely derivable from `name`/`opponent`/`speaking` (naming,
/// lobby, chat body, or command) rather than introducing a redundant state
/// machine next to it.
///
/// The line framer for this connection lives in the reactor's per-socket
/// read stream, not here — the registry never touches the read half, only
/// the write half, so there's nothing for it to frame.
pub struct Client {
    pub id: ClientId,
    pub addr: SocketAddr,
    pub writer: OwnedWriteHalf,

    pub name: Option<String>,
    pub speaking: bool,

    pub opponent: Option<ClientId>,
    pub last_opponent: Option<ClientId>,

    pub hp: i32,
    pub power_moves: u32,
    pub turn: bool,
    pub shielded: bool,
    pub item: Option<Item>,
}

impl Client {
    pub fn new(id: ClientId, addr: SocketAddr, writer: OwnedWriteHalf) -> Self {
        Self {
            id,
            addr,
            writer,
            name: None,
            speaking: false,
            opponent: None,
            last_opponent: None,
            hp: 0,
            power_moves: 0,
            turn: false,
            shielded: false,
            item: None,
        }
    }

    pub fn named(&self) -> bool {
        self.name.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("???")
    }

    /// hp clamped to zero for display only — underlying hp may still go
    /// negative internally until the match actually ends.
    pub fn display_hp(&self) -> i32 {
        self.hp.max(0)
    }

    pub fn item_label(&self) -> String {
        match self.item {
            Some(item) => item.to_string(),
            None => "None".to_string(),
        }
    }

    pub fn item_description_label(&self) -> &'static str {
        match self.item {
            Some(item) => item.description(),
            None => "None\n",
        }
    }

    /// What a freshly completed line from this client should be interpreted
    /// as, derived from current state rather than tracked redundantly.
    pub fn dispatch(&self) -> Dispatch {
        if self.name.is_none() {
            Dispatch::Naming
        } else if self.opponent.is_none() {
            Dispatch::Lobby
        } else if self.speaking {
            Dispatch::ChatBody
        } else {
            Dispatch::Command
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Naming,
    Lobby,
    ChatBody,
    Command,
}
