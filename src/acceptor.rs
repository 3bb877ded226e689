//! Owns the listening socket; admits new connections.
//!
//! Grounded on `addclient`/`bindandlisten` in
//! `examples/original_source/Multiplayer Turn Based Fighting Game/battle.c`,
//! reworked from the C `malloc`+intrusive-list insertion into constructing
//! a [`Client`] and handing it to the [`Registry`].

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};

use crate::client::{Client, ClientId};
use crate::protocol;
use crate::registry::Registry;

/// Binds and listens on `bind_addr` (default port 56041, all interfaces,
/// unless the caller resolved something else from CLI args).
pub async fn bind(bind_addr: &str) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(bind_addr).await?;
    Ok(listener)
}

/// Registers a just-accepted connection as a default-initialised client and
/// sends the name prompt. Returns the new client's id and its read half so
/// the caller can fold it into its dynamic read multiplexer — the registry
/// owns the write half via [`Client`], but the read half has to live in the
/// reactor's `StreamMap` instead.
///
/// Deliberately takes an already-`accept`ed [`TcpStream`] rather than the
/// listener itself: the caller races `TcpListener::accept` against other
/// events, which is safe because accept is cancel-safe, but the prompt
/// write and registry insert below are not — they must run to completion
/// once a connection has actually landed, not while still part of a future
/// that might lose that race and get dropped.
pub async fn admit(
    registry: &mut Registry,
    stream: TcpStream,
    addr: std::net::SocketAddr,
) -> std::io::Result<(ClientId, OwnedReadHalf)> {
    stream.set_nodelay(true).ok();
    let id = registry.alloc_id();
    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(protocol::NAME_PROMPT.as_bytes()).await?;
    registry.insert(Client::new(id, addr, write_half));
    Ok((id, read_half))
}
