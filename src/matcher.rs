//! Scans unpaired, named clients; forms pairs under rematch-avoidance
//! rules; initialises match state.
//!
//! Grounded on `pair_clients_in_list`/`pair_clients` in
//! `examples/original_source/Multiplayer Turn Based Fighting Game/battle.c`.
//! Run whenever the unpaired set may have changed: after accept, after
//! disconnect, after any match resolution.

use tokio::io::AsyncWriteExt;

use crate::client::ClientId;
use crate::engine;
use crate::protocol;
use crate::registry::Registry;
use crate::rng::Rng;

pub async fn run(registry: &mut Registry, rng: &mut Rng) {
    let mut shuffled = unpaired_in_registry_order(registry);
    rng.shuffle(&mut shuffled);

    let mut iter = shuffled.into_iter();
    #[allow(clippy::while_let_loop)] // pulls two items (p, q) per iteration
    loop {
        let Some(p) = iter.next() else { break };
        let Some(q) = iter.next() else { break }; // odd one out waits for the fallback pass
        if rematch_eligible(registry, p, q) {
            begin_match(registry, rng, p, q).await;
        }
        // ineligible pairs are simply left unpaired for the fallback pass below
        // rather than retried against other candidates in this random draw —
        // matching the original's single pairwise walk over the shuffled array.
    }

    // Fallback pass: scan remaining unpaired clients in registry order,
    // pairing each with the first eligible partner found.
    //
    // Whether this pass may ignore the rematch predicate as a last resort is
    // left open by informal descriptions of this matching scheme, but
    // `pair_clients_in_list`'s second loop calls `pair_clients` — the very
    // same function used for the first pass — which re-checks `lastbattled`
    // internally. The original therefore never actually ignores the
    // predicate in its fallback; this implementation follows that and keeps
    // rematch-avoidance in the fallback too (see DESIGN.md).
    let remaining = unpaired_in_registry_order(registry);
    let mut i = 0;
    while i < remaining.len() {
        let p = remaining[i];
        i += 1;
        if registry.get(p).map(|c| c.opponent.is_some()).unwrap_or(true) {
            continue;
        }
        let partner = remaining[i..].iter().copied().find(|&q| {
            registry.get(q).map(|c| c.opponent.is_none()).unwrap_or(false)
                && rematch_eligible(registry, p, q)
        });
        if let Some(q) = partner {
            begin_match(registry, rng, p, q).await;
        }
    }
}

fn unpaired_in_registry_order(registry: &Registry) -> Vec<ClientId> {
    registry
        .ids_in_order()
        .into_iter()
        .filter(|&id| registry.get(id).map(|c| c.named() && c.opponent.is_none()).unwrap_or(false))
        .collect()
}

/// `(t.lastbattled != p) || (p.lastbattled != t)` in the original — either
/// side not remembering the other as their last opponent is enough.
///
/// Some descriptions of this rule word it as AND (both sides must have
/// forgotten each other) rather than OR; this follows the original's OR,
/// which is the looser of the two. The two are practically unobservable
/// apart from each other, since `last_opponent` is always set mutually
/// between two clients who actually battled.
fn rematch_eligible(registry: &Registry, p: ClientId, q: ClientId) -> bool {
    let cp = registry.get(p);
    let cq = registry.get(q);
    match (cp, cq) {
        (Some(cp), Some(cq)) => cp.last_opponent != Some(q) || cq.last_opponent != Some(p),
        _ => false,
    }
}

async fn begin_match(registry: &mut Registry, rng: &mut Rng, a: ClientId, b: ClientId) {
    let Some((mut ca, mut cb)) = registry.take_pair(a, b) else { return };

    ca.opponent = Some(b);
    cb.opponent = Some(a);
    ca.hp = rng.range_inclusive(11, 30);
    cb.hp = rng.range_inclusive(11, 30);
    ca.power_moves = rng.range_inclusive(1, 2) as u32;
    cb.power_moves = rng.range_inclusive(1, 2) as u32;
    ca.speaking = false;
    cb.speaking = false;
    ca.item = None;
    cb.item = None;
    ca.shielded = false;
    cb.shielded = false;

    let _ = ca.writer.write_all(protocol::engage(cb.display_name()).as_bytes()).await;
    let _ = cb.writer.write_all(protocol::engage(ca.display_name()).as_bytes()).await;

    if rng.coin_flip() {
        ca.turn = true;
        cb.turn = false;
    } else {
        ca.turn = false;
        cb.turn = true;
    }
    let a_goes_first = ca.turn;

    registry.put_back(ca);
    registry.put_back(cb);

    if a_goes_first {
        engine::emit_status_frame(registry, a, b).await;
    } else {
        engine::emit_status_frame(registry, b, a).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use std::net::SocketAddr;
    use tokio::net::{TcpListener, TcpStream};

    async fn connected_pair_of_clients(registry: &mut Registry, names: &[&str]) -> Vec<TcpStream> {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let dummy: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let mut client_sides = Vec::new();
        for name in names {
            let (accepted, connected) = tokio::join!(listener.accept(), TcpStream::connect(addr));
            let (server_sock, _) = accepted.unwrap();
            let client_sock = connected.unwrap();
            let id = registry.alloc_id();
            let (_, w) = server_sock.into_split();
            let mut c = Client::new(id, dummy, w);
            c.name = Some(name.to_string());
            registry.insert(c);
            client_sides.push(client_sock);
        }
        client_sides
    }

    #[tokio::test]
    async fn rematch_avoided_when_alternative_exists() {
        let mut registry = Registry::new();
        let _sockets = connected_pair_of_clients(&mut registry, &["alice", "bob", "carol"]).await;
        let ids = registry.ids_in_order();
        let (alice, bob, carol) = (ids[0], ids[1], ids[2]);

        registry.get_mut(alice).unwrap().last_opponent = Some(bob);
        registry.get_mut(bob).unwrap().last_opponent = Some(alice);

        let mut rng = Rng::seeded(99);
        run(&mut registry, &mut rng).await;

        // Alice and Bob must not be re-paired with each other while Carol
        // (a valid alternative) is available.
        let alice_opp = registry.get(alice).unwrap().opponent;
        let bob_opp = registry.get(bob).unwrap().opponent;
        assert_ne!(alice_opp, Some(bob));
        assert_ne!(bob_opp, Some(alice));
        assert!(alice_opp == Some(carol) || bob_opp == Some(carol));
    }

    #[tokio::test]
    async fn pairing_is_symmetric() {
        let mut registry = Registry::new();
        let _sockets = connected_pair_of_clients(&mut registry, &["alice", "bob"]).await;
        let ids = registry.ids_in_order();

        let mut rng = Rng::seeded(5);
        run(&mut registry, &mut rng).await;

        for &id in &ids {
            if let Some(opp) = registry.get(id).unwrap().opponent {
                assert_eq!(registry.get(opp).unwrap().opponent, Some(id));
            }
        }
    }

    #[tokio::test]
    async fn unnamed_clients_are_never_paired() {
        let mut registry = Registry::new();
        let mut sockets = connected_pair_of_clients(&mut registry, &["alice"]).await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (accepted, connected) = tokio::join!(listener.accept(), TcpStream::connect(addr));
        let (server_sock, _) = accepted.unwrap();
        sockets.push(connected.unwrap());
        let dummy: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let (_, w) = server_sock.into_split();
        let id = registry.alloc_id();
        registry.insert(Client::new(id, dummy, w));

        let mut rng = Rng::seeded(11);
        run(&mut registry, &mut rng).await;

        for id in registry.ids_in_order() {
            let c = registry.get(id).unwrap();
            if !c.named() {
                assert!(c.opponent.is_none());
            }
        }
    }
}
