//! End-to-end scenarios driving the reactor over real loopback sockets,
//! with a seeded RNG for determinism.

use std::time::Duration;

use duel_arena::logger::Logger;
use duel_arena::reactor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_server(seed: u64) -> String {
    // Bind here and hand the live listener straight to the reactor — no
    // window where the port is free for something else to grab, unlike
    // binding a throwaway listener just to learn a free port and then
    // racing the reactor to rebind the same address.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::task::spawn_local(async move {
        let _ = reactor::run_on(listener, Some(seed), Logger::new(0)).await;
    });

    addr
}

async fn connect(addr: &str) -> TcpStream {
    for _ in 0..50 {
        if let Ok(s) = TcpStream::connect(addr).await {
            return s;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("could not connect to {addr}");
}

/// Reads whatever is available right now, blocking for the first byte but
/// not for a specific message count — several server writes often land in
/// one readable chunk, so tests match on `contains` against the accumulated
/// text rather than expecting one message per `recv`.
async fn recv(stream: &mut TcpStream) -> String {
    let mut buf = vec![0u8; 8192];
    let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .expect("timed out waiting for server data")
        .unwrap();
    let mut out = String::from_utf8_lossy(&buf[..n]).into_owned();

    // Drain any further bytes that arrived essentially at once.
    loop {
        match tokio::time::timeout(Duration::from_millis(200), stream.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => out.push_str(&String::from_utf8_lossy(&buf[..n])),
            _ => break,
        }
    }
    out
}

async fn send_line(stream: &mut TcpStream, line: &str) {
    stream.write_all(format!("{line}\n").as_bytes()).await.unwrap();
}

#[tokio::test]
async fn name_retry_then_success() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let addr = spawn_server(1).await;
            let mut c = connect(&addr).await;

            let prompt = recv(&mut c).await;
            assert_eq!(prompt, "What is your name? ");

            let overlong = "x".repeat(30);
            send_line(&mut c, &overlong).await;
            let reply = recv(&mut c).await;
            assert_eq!(reply, "Name was too long\n");

            send_line(&mut c, "Bob").await;
            let welcome = recv(&mut c).await;
            assert_eq!(welcome, "Welcome Bob! Waiting for opponent...\n");
        })
        .await;
}

#[tokio::test]
async fn two_named_clients_are_paired_and_see_status_frame() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let addr = spawn_server(7).await;

            let mut alice = connect(&addr).await;
            recv(&mut alice).await; // name prompt
            send_line(&mut alice, "Alice").await;

            let mut bob = connect(&addr).await;
            recv(&mut bob).await; // name prompt
            send_line(&mut bob, "Bob").await;

            let alice_text = recv(&mut alice).await;
            let bob_text = recv(&mut bob).await;

            assert!(alice_text.contains("Welcome Alice! Waiting for opponent...\n"), "alice_text = {alice_text:?}");
            assert!(bob_text.contains("Welcome Bob! Waiting for opponent...\n"), "bob_text = {bob_text:?}");
            assert!(alice_text.contains("Bob enters the arena"));
            assert!(alice_text.contains("You engage Bob!"));
            assert!(bob_text.contains("You engage Alice!"));

            // Exactly one of the two gets "It's your turn!"; the other gets
            // the waiting frame, decided by the first-mover coin flip.
            let alice_turn = alice_text.contains("It's your turn!");
            let bob_turn = bob_text.contains("It's your turn!");
            assert_ne!(alice_turn, bob_turn, "exactly one side should hold the first turn");
            if !alice_turn {
                assert!(alice_text.contains("Waiting for"));
            }
            if !bob_turn {
                assert!(bob_text.contains("Waiting for"));
            }
        })
        .await;
}

#[tokio::test]
async fn forfeit_on_disconnect_credits_survivor() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let addr = spawn_server(3).await;

            let mut alice = connect(&addr).await;
            recv(&mut alice).await;
            send_line(&mut alice, "Alice").await;

            let mut bob = connect(&addr).await;
            recv(&mut bob).await;
            send_line(&mut bob, "Bob").await;

            recv(&mut bob).await;
            recv(&mut alice).await; // welcome + broadcast + engage + status frame, batched

            drop(bob);

            let msg = recv(&mut alice).await;
            assert!(msg.contains("You won the game!"), "alice should be credited with the win on bob's disconnect: {msg:?}");
            assert!(msg.contains("Waiting for opponent"), "alice should be re-queued after the forfeit: {msg:?}");
        })
        .await;
}
