//! Per-match turn state machine: attack / power move / speak / use-item,
//! damage resolution, shield, item grant, victory detection.
//!
//! Grounded on `perform_attack`/`perform_powermove`/`handle_game_actions`/
//! `display_status`/`handle_loss` in
//! `examples/original_source/Multiplayer Turn Based Fighting Game/battle.c`.

use tokio::io::AsyncWriteExt;

use crate::client::ClientId;
use crate::protocol::{self, Command, Item};
use crate::registry::Registry;
use crate::rng::Rng;

/// Result of feeding one command line to the engine. The reactor logs
/// `Unknown`/`NotYourTurn` at a low verbosity and otherwise does nothing
/// with the outcome — all player-visible effects already happened via
/// socket writes inside this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    NotYourTurn,
    Unknown,
}

/// Dispatches one command line from `actor` against the attack/power-move/
/// speak/use-item command table.
/// `actor` must currently be paired; callers check `Dispatch::Command`
/// before calling this.
pub async fn handle_command(
    registry: &mut Registry,
    rng: &mut Rng,
    actor: ClientId,
    line: &str,
) -> Outcome {
    let Some(opponent) = registry.get(actor).and_then(|c| c.opponent) else {
        return Outcome::Unknown;
    };

    let has_turn = registry.get(actor).map(|c| c.turn).unwrap_or(false);

    match Command::parse(line) {
        Some(_) if !has_turn => Outcome::NotYourTurn,
        Some(Command::Speak) => {
            // Speaking never consumes the turn, but it's still gated on
            // having it in the first place — the guard above covers that.
            if let Some(c) = registry.get_mut(actor) {
                c.speaking = true;
                let _ = c.writer.write_all(protocol::SPEAK_PROMPT.as_bytes()).await;
            }
            Outcome::Handled
        }
        Some(Command::Attack) => {
            attack(registry, rng, actor, opponent).await;
            Outcome::Handled
        }
        Some(Command::PowerMove) => {
            power_move(registry, rng, actor, opponent).await;
            Outcome::Handled
        }
        Some(Command::UseItem) => {
            use_item(registry, actor, opponent).await;
            Outcome::Handled
        }
        None => Outcome::Unknown,
    }
}

/// The line following an `s` command is the chat body, delivered verbatim
/// (the sender's terminating newline is preserved, matching
/// `send_message`'s `"%s says: %s"` where `message` already ends in `\n`).
pub async fn deliver_chat(registry: &mut Registry, speaker: ClientId, body: &str) {
    let Some(opponent) = registry.get(speaker).and_then(|c| c.opponent) else {
        return;
    };
    let Some((mut s, mut o)) = registry.take_pair(speaker, opponent) else {
        return;
    };
    s.speaking = false;
    let msg = protocol::chat_delivery(s.display_name(), &format!("{body}\n"));
    let _ = o.writer.write_all(msg.as_bytes()).await;
    let _ = s.writer.write_all(protocol::MESSAGE_SENT.as_bytes()).await;

    let (actor, waiting) = if s.turn { (speaker, opponent) } else { (opponent, speaker) };
    registry.put_back(s);
    registry.put_back(o);
    emit_status_frame(registry, actor, waiting).await;
}

/// Full damage resolution ordering for a plain attack: shield halving,
/// clamped display hp, victory check, then an item grant roll. Item grant
/// only happens if the match didn't just end.
async fn attack(registry: &mut Registry, rng: &mut Rng, actor: ClientId, target: ClientId) {
    let Some((mut a, mut t)) = registry.take_pair(actor, target) else { return };

    let mut damage = rng.range_inclusive(2, 6);
    let was_shielded = t.shielded;
    if was_shielded {
        damage /= 2;
        t.shielded = false;
    }
    t.hp -= damage;

    let actor_name = a.display_name().to_string();
    let target_name = t.display_name().to_string();

    if was_shielded {
        let notice = protocol::shielded_notice(&target_name);
        let _ = a.writer.write_all(notice.as_bytes()).await;
        let _ = t.writer.write_all(notice.as_bytes()).await;
    }

    let _ = a.writer.write_all(protocol::attack_to_actor(&target_name, damage).as_bytes()).await;
    let _ = t.writer.write_all(protocol::attack_to_target(&actor_name, damage).as_bytes()).await;

    if let Some((winner, loser)) = check_victory(&a, &t, actor, target) {
        registry.put_back(a);
        registry.put_back(t);
        resolve_victory(registry, winner, loser).await;
        return;
    }

    a.item = Some(Item::from_roll(rng.range_inclusive(1, 3)));
    a.turn = false;
    t.turn = true;

    registry.put_back(a);
    registry.put_back(t);
    emit_status_frame(registry, target, actor).await;
}

async fn power_move(registry: &mut Registry, rng: &mut Rng, actor: ClientId, target: ClientId) {
    let no_charges = registry.get(actor).map(|c| c.power_moves == 0).unwrap_or(true);
    if no_charges {
        if let Some(a) = registry.get_mut(actor) {
            let _ = a.writer.write_all(protocol::POWER_MOVES_DEPLETED.as_bytes()).await;
        }
        return;
    }

    let Some((mut a, mut t)) = registry.take_pair(actor, target) else { return };
    a.power_moves -= 1;

    let actor_name = a.display_name().to_string();
    let target_name = t.display_name().to_string();

    if rng.coin_flip() {
        let damage = rng.range_inclusive(6, 18);
        t.hp -= damage;
        let _ = a.writer.write_all(protocol::power_hit_to_actor(&target_name, damage).as_bytes()).await;
        let _ = t.writer.write_all(protocol::power_hit_to_target(&actor_name, damage).as_bytes()).await;
    } else {
        let _ = a.writer.write_all(protocol::POWER_MISS_TO_ACTOR.as_bytes()).await;
        let _ = t.writer.write_all(protocol::power_miss_to_target(&actor_name).as_bytes()).await;
    }

    if let Some((winner, loser)) = check_victory(&a, &t, actor, target) {
        registry.put_back(a);
        registry.put_back(t);
        resolve_victory(registry, winner, loser).await;
        return;
    }

    a.turn = false;
    t.turn = true;

    registry.put_back(a);
    registry.put_back(t);
    emit_status_frame(registry, target, actor).await;
}

async fn use_item(registry: &mut Registry, actor: ClientId, target: ClientId) {
    let Some(item) = registry.get(actor).and_then(|c| c.item) else {
        return;
    };
    let Some((mut a, mut t)) = registry.take_pair(actor, target) else { return };

    let notice = protocol::item_used(a.display_name(), item);
    let _ = a.writer.write_all(notice.as_bytes()).await;
    let _ = t.writer.write_all(notice.as_bytes()).await;

    match item {
        Item::HealthPotion => a.hp += 10,
        Item::ShieldPotion => a.shielded = true,
        Item::StrengthPotion => a.power_moves += 1,
    }
    a.item = None;

    // Shield potion does not consume the turn.
    let consumes_turn = !matches!(item, Item::ShieldPotion);

    if consumes_turn {
        a.turn = false;
        t.turn = true;
        registry.put_back(a);
        registry.put_back(t);
        emit_status_frame(registry, target, actor).await;
    } else {
        registry.put_back(a);
        registry.put_back(t);
        emit_status_frame(registry, actor, target).await;
    }
}

fn check_victory(
    a: &crate::client::Client,
    t: &crate::client::Client,
    actor: ClientId,
    target: ClientId,
) -> Option<(ClientId, ClientId)> {
    if t.hp <= 0 {
        Some((actor, target))
    } else if a.hp <= 0 {
        Some((target, actor))
    } else {
        None
    }
}

/// Resolves a finished match: messages both sides, clears pairing, records
/// `last_opponent`, re-queues both. Shared by both a clean victory and a
/// disconnect forfeit.
pub async fn resolve_victory(registry: &mut Registry, winner: ClientId, loser: ClientId) {
    let Some((mut w, mut l)) = registry.take_pair(winner, loser) else { return };

    let _ = w.writer.write_all(protocol::VICTORY.as_bytes()).await;
    let _ = l.writer.write_all(protocol::DEFEAT.as_bytes()).await;

    w.last_opponent = Some(loser);
    l.last_opponent = Some(winner);
    w.opponent = None;
    l.opponent = None;
    w.speaking = false;
    l.speaking = false;

    let _ = w.writer.write_all(protocol::WAITING_FOR_OPPONENT.as_bytes()).await;
    let _ = l.writer.write_all(protocol::WAITING_FOR_OPPONENT.as_bytes()).await;

    registry.put_back(w);
    registry.put_back(l);
}

/// Forfeit on disconnect: the survivor wins by hp ≤ 0 forfeit. `departing`
/// has already been removed
/// from the registry by the caller; only the survivor remains to notify.
pub async fn handle_disconnect(registry: &mut Registry, departing: ClientId, survivor: Option<ClientId>) {
    let Some(survivor) = survivor else { return };
    let Some(s) = registry.get_mut(survivor) else { return };

    s.last_opponent = Some(departing);
    s.opponent = None;
    s.speaking = false;

    let _ = s.writer.write_all(protocol::VICTORY.as_bytes()).await;
    let _ = s.writer.write_all(protocol::WAITING_FOR_OPPONENT.as_bytes()).await;
}

/// Emits the status frame after any turn transition, including match start.
/// `actor` is whoever now holds the turn.
///
/// Reproduces the original `display_status`'s exact write sequence and
/// literal ANSI-wrapped strings verbatim, not just a paraphrased summary.
pub async fn emit_status_frame(registry: &mut Registry, actor: ClientId, waiting: ClientId) {
    let Some((mut a, mut w)) = registry.take_pair(actor, waiting) else { return };

    let actor_name = a.display_name().to_string();
    let waiting_name = w.display_name().to_string();
    let a_hp = a.display_hp();
    let w_hp = w.display_hp();
    let pm = a.power_moves;
    let item_label = a.item_label();
    let item_desc = a.item_description_label().to_string();

    let _ = a.writer.write_all(
        format!("{}\nYou have {a_hp} hitpoints and {pm} powermoves\n{}", protocol::ANSI_RED, protocol::ANSI_RESET)
            .as_bytes(),
    ).await;
    let _ = a.writer.write_all(
        format!("{}{waiting_name} has {w_hp} hitpoints\n{}", protocol::ANSI_RED, protocol::ANSI_RESET).as_bytes(),
    ).await;
    let _ = w.writer.write_all(
        format!("{}\nYou have {w_hp} hitpoints\n{}", protocol::ANSI_RED, protocol::ANSI_RESET).as_bytes(),
    ).await;
    let _ = a.writer.write_all(
        format!(
            "{}\nYour items: {item_label} - Description: {item_desc}{}",
            protocol::ANSI_RED,
            protocol::ANSI_RESET
        )
        .as_bytes(),
    ).await;
    let _ = a.writer.write_all(
        format!("{}\nIt's your turn!\n{}", protocol::ANSI_LIGHT_BLUE, protocol::ANSI_RESET).as_bytes(),
    ).await;
    let _ = w.writer.write_all(
        format!("{}\nIt's {actor_name}' turn!\n{}", protocol::ANSI_LIGHT_BLUE, protocol::ANSI_RESET).as_bytes(),
    ).await;
    let _ = a.writer.write_all(
        format!("{}{}{}", protocol::ANSI_LIGHT_BLUE, protocol::TURN_MENU, protocol::ANSI_RESET).as_bytes(),
    ).await;
    let _ = w.writer.write_all(
        format!(
            "{}{}{}",
            protocol::ANSI_LIGHT_BLUE,
            protocol::waiting_for_turn(&actor_name),
            protocol::ANSI_RESET
        )
        .as_bytes(),
    ).await;

    registry.put_back(a);
    registry.put_back(w);
}
