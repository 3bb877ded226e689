//! Central event loop; multiplexes readiness on all sockets; dispatches to
//! the acceptor, matcher, and match engine.
//!
//! Single async task, pinned to a `current_thread` runtime by the binary
//! entry point — single-threaded, cooperative, event-driven scheduling is
//! load-bearing here, not just descriptive: there is exactly one suspension
//! point across every connection, the `tokio::select!` below.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::pin::Pin;
use std::rc::Rc;

use futures_util::stream::{self, Stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio_stream::StreamMap;

use crate::acceptor;
use crate::client::{ClientId, Dispatch};
use crate::config::Args;
use crate::engine;
use crate::framer::LineFramer;
use crate::logger::Logger;
use crate::matcher;
use crate::protocol;
use crate::registry::Registry;
use crate::rng::Rng;

const READ_CHUNK: usize = 1024;

enum ClientEvent {
    Line(String),
    NameTooLong,
    Disconnected,
}

type ClientStream = Pin<Box<dyn Stream<Item = ClientEvent>>>;

enum Event {
    Listening { addr: String },
    Connected { addr: SocketAddr },
    Disconnected { addr: SocketAddr },
    AcceptError { reason: String },
    UnknownCommand { addr: SocketAddr, raw: String },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Listening { addr } => write!(f, "Server listening on {addr}"),
            Event::Connected { addr } => write!(f, "Client connected from {addr}"),
            Event::Disconnected { addr } => write!(f, "Client {addr} disconnected"),
            Event::AcceptError { reason } => write!(f, "Accept error: {reason}"),
            Event::UnknownCommand { addr, raw } => {
                write!(f, "{addr} sent unrecognised command: {raw:?}")
            }
        }
    }
}

/// Wraps a client's read half in a stream of framed lines. Frames are
/// produced by [`LineFramer`] (not tokio's built-in `Lines`), so that
/// component stays independently testable and owns the "name too long"
/// overflow check.
///
/// `naming` is flipped to `false` by the reactor once the client is named;
/// the overflow check is only enforced while it's `true`, i.e. while the
/// client is still in naming mode.
fn client_event_stream(mut read: OwnedReadHalf, naming: Rc<Cell<bool>>) -> ClientStream {
    struct State {
        read: OwnedReadHalf,
        framer: LineFramer,
        pending: std::collections::VecDeque<String>,
        naming: Rc<Cell<bool>>,
        done: bool,
    }

    let _ = &mut read; // silence unused_mut when READ_CHUNK branch never runs on some targets
    let state = State {
        read,
        framer: LineFramer::new(),
        pending: std::collections::VecDeque::new(),
        naming,
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }
            if let Some(line) = state.pending.pop_front() {
                return Some((ClientEvent::Line(line), state));
            }

            let mut buf = [0u8; READ_CHUNK];
            match state.read.read(&mut buf).await {
                Ok(0) | Err(_) => {
                    state.done = true;
                    return Some((ClientEvent::Disconnected, state));
                }
                Ok(n) => {
                    let mut lines = state.framer.feed(&buf[..n]);
                    if lines.is_empty() {
                        if state.naming.get() && state.framer.buffered_len() > protocol::MAX_NAME {
                            state.framer.clear();
                            return Some((ClientEvent::NameTooLong, state));
                        }
                        continue;
                    }
                    let first = lines.remove(0);
                    state.pending.extend(lines);
                    return Some((ClientEvent::Line(first), state));
                }
            }
        }
    }))
}

pub async fn run(args: Args, logger: Logger) -> std::io::Result<()> {
    let listener = acceptor::bind(&args.bind).await?;
    logger.info(Event::Listening { addr: args.bind.clone() });
    run_on(listener, args.seed, logger).await
}

/// Runs the event loop against an already-bound listener. Split out of
/// [`run`] so tests can bind their own ephemeral port and hand it over
/// directly, rather than binding, dropping, and racing the reactor to
/// rebind the same address.
pub async fn run_on(
    listener: tokio::net::TcpListener,
    seed: Option<u64>,
    logger: Logger,
) -> std::io::Result<()> {
    let mut registry = Registry::new();
    let mut rng = match seed {
        Some(seed) => Rng::seeded(seed),
        None => Rng::from_entropy(),
    };
    let mut streams: StreamMap<ClientId, ClientStream> = StreamMap::new();
    let mut naming_gates: HashMap<ClientId, Rc<Cell<bool>>> = HashMap::new();

    loop {
        matcher::run(&mut registry, &mut rng).await;

        tokio::select! {
            // Only the raw accept is raced here — `TcpListener::accept` is
            // cancel-safe (tokio docs), but admitting a client also writes
            // the name prompt and registers it in the registry, neither of
            // which is safe to abandon mid-flight if this branch loses the
            // race. That work happens below, in the arm body, which runs to
            // completion once selected rather than competing with the other
            // branch.
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        match acceptor::admit(&mut registry, stream, addr).await {
                            Ok((id, read_half)) => {
                                let gate = Rc::new(Cell::new(true));
                                naming_gates.insert(id, gate.clone());
                                streams.insert(id, client_event_stream(read_half, gate));
                                logger.info(Event::Connected { addr });
                            }
                            Err(e) => logger.warn(Event::AcceptError { reason: e.to_string() }),
                        }
                    }
                    Err(e) => logger.warn(Event::AcceptError { reason: e.to_string() }),
                }
            }
            Some((id, event)) = streams.next() => {
                handle_event(&mut registry, &mut streams, &mut naming_gates, &mut rng, &logger, id, event).await;
            }
        }
    }
}

async fn handle_event(
    registry: &mut Registry,
    streams: &mut StreamMap<ClientId, ClientStream>,
    naming_gates: &mut HashMap<ClientId, Rc<Cell<bool>>>,
    rng: &mut Rng,
    logger: &Logger,
    id: ClientId,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Disconnected => {
            streams.remove(&id);
            naming_gates.remove(&id);
            if let Some(client) = registry.remove(id) {
                logger.info(Event::Disconnected { addr: client.addr });
                if let Some(name) = &client.name {
                    broadcast(registry, id, &protocol::arena_leave_broadcast(name)).await;
                }
                engine::handle_disconnect(registry, id, client.opponent).await;
            }
        }
        ClientEvent::NameTooLong => {
            if let Some(c) = registry.get_mut(id) {
                let _ = c.writer.write_all(protocol::NAME_TOO_LONG.as_bytes()).await;
            }
        }
        ClientEvent::Line(line) => {
            let Some(dispatch) = registry.get(id).map(|c| c.dispatch()) else { return };
            match dispatch {
                Dispatch::Naming => handle_naming(registry, naming_gates, id, &line).await,
                Dispatch::Lobby => {
                    // A named, unpaired client's input has nowhere to go yet
                    // (original source: falls through every branch and is a
                    // no-op). Left deliberately silent.
                }
                Dispatch::ChatBody => engine::deliver_chat(registry, id, &line).await,
                Dispatch::Command => {
                    let outcome = engine::handle_command(registry, rng, id, &line).await;
                    if outcome == engine::Outcome::Unknown
                        && let Some(c) = registry.get(id)
                    {
                        logger.verbose(Event::UnknownCommand { addr: c.addr, raw: line });
                    }
                }
            }
        }
    }
}

async fn handle_naming(
    registry: &mut Registry,
    naming_gates: &mut HashMap<ClientId, Rc<Cell<bool>>>,
    id: ClientId,
    line: &str,
) {
    if line.is_empty() || line.len() > protocol::MAX_NAME {
        if let Some(c) = registry.get_mut(id) {
            if line.len() > protocol::MAX_NAME {
                let _ = c.writer.write_all(protocol::NAME_TOO_LONG.as_bytes()).await;
            } else {
                let _ = c.writer.write_all(protocol::NAME_PROMPT.as_bytes()).await;
            }
        }
        return;
    }

    if let Some(gate) = naming_gates.get(&id) {
        gate.set(false);
    }

    let name = line.to_string();
    if let Some(c) = registry.get_mut(id) {
        c.name = Some(name.clone());
        let _ = c.writer.write_all(protocol::welcome(&name).as_bytes()).await;
    }
    broadcast(registry, id, &protocol::arena_enter_broadcast(&name)).await;
}

async fn broadcast(registry: &mut Registry, exclude: ClientId, msg: &str) {
    for id in registry.ids_in_order() {
        if id == exclude {
            continue;
        }
        if let Some(c) = registry.get_mut(id) {
            let _ = c.writer.write_all(msg.as_bytes()).await;
        }
    }
}
