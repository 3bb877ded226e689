//! Wire-level literals and the small command/item vocabularies.
//!
//! Every string a test is allowed to assert against lives here, not
//! scattered across `engine.rs`/`matcher.rs`, so the protocol surface is one
//! file to audit.

use std::fmt;

pub const MAX_NAME: usize = 25;
pub const DEFAULT_PORT: u16 = 56041;
pub const LISTEN_BACKLOG: u32 = 5;

pub const ANSI_RED: &str = "\x1b[31m";
pub const ANSI_LIGHT_BLUE: &str = "\x1b[94m";
pub const ANSI_RESET: &str = "\x1b[0m";

pub const NAME_PROMPT: &str = "What is your name? ";
pub const NAME_TOO_LONG: &str = "Name was too long\n";

pub fn welcome(name: &str) -> String {
    format!("Welcome {name}! Waiting for opponent...\n")
}

pub fn arena_enter_broadcast(name: &str) -> String {
    format!("*** {name} enters the arena ***\n")
}

pub fn arena_leave_broadcast(name: &str) -> String {
    format!("{name} has left the arena\n")
}

pub fn engage(opponent_name: &str) -> String {
    format!("You engage {opponent_name}!\n")
}

pub const POWER_MOVES_DEPLETED: &str = "\nYou have no power moves left!\n";
pub const SPEAK_PROMPT: &str = "\nPress enter to send your message: \n";
pub const MESSAGE_SENT: &str = "\nMessage sent.\n";

pub fn chat_delivery(sender_name: &str, body: &str) -> String {
    format!("{sender_name} says: {body}")
}

pub fn attack_to_actor(opponent_name: &str, damage: i32) -> String {
    format!("\nYou attacked {opponent_name} and dealt {damage} damage!\n")
}

pub fn attack_to_target(actor_name: &str, damage: i32) -> String {
    format!("\n{actor_name} attacked! You took {damage} damage!\n")
}

pub fn power_hit_to_actor(opponent_name: &str, damage: i32) -> String {
    format!("\nYou used a power move on {opponent_name} and dealt {damage} damage!\n")
}

pub fn power_hit_to_target(actor_name: &str, damage: i32) -> String {
    format!("\n{actor_name} used a power move! You took {damage} damage!\n")
}

pub const POWER_MISS_TO_ACTOR: &str = "\nYou missed! You dealt 0 damage!\n";

pub fn power_miss_to_target(actor_name: &str) -> String {
    format!("\n{actor_name} missed! You took 0 damage!\n")
}

pub fn shielded_notice(shielded_name: &str) -> String {
    format!("{shielded_name} is shielded! Damage reduced by half!\n")
}

pub fn item_used(actor_name: &str, item: Item) -> String {
    format!("\n{actor_name} used a [{item}]!\n")
}

pub const VICTORY: &str = "You won the game!\n";
pub const DEFEAT: &str = "You lost the game!\n";
pub const WAITING_FOR_OPPONENT: &str = "Waiting for opponent...\n";

pub fn waiting_for_turn(actor_name: &str) -> String {
    format!("Waiting for {actor_name} to end turn\n\n")
}

pub const TURN_MENU: &str =
    "\n(a)ttack\n(p)owermove\n(s)peak\n(u)se item\n\n";

/// One of the three power-ups an attack can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    HealthPotion,
    ShieldPotion,
    StrengthPotion,
}

impl Item {
    pub fn description(self) -> &'static str {
        match self {
            Item::HealthPotion => "This Potion increases your health by 10 hp!\n",
            Item::ShieldPotion => "This potion reduces the next damage you take by half!\n",
            Item::StrengthPotion => "This Potion increases your powermoves by 1!\n",
        }
    }

    pub fn from_roll(roll: i32) -> Self {
        match roll {
            1 => Item::HealthPotion,
            2 => Item::ShieldPotion,
            _ => Item::StrengthPotion,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Item::HealthPotion => "HEALTH POTION",
            Item::ShieldPotion => "SHIELD POTION",
            Item::StrengthPotion => "STRENGTH POTION",
        };
        write!(f, "{s}")
    }
}

/// First byte of a combat command line.
/// Unrecognised bytes simply don't parse — the caller leaves the turn alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Attack,
    PowerMove,
    Speak,
    UseItem,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.as_bytes().first()? {
            b'a' => Some(Command::Attack),
            b'p' => Some(Command::PowerMove),
            b's' => Some(Command::Speak),
            b'u' => Some(Command::UseItem),
            _ => None,
        }
    }
}
