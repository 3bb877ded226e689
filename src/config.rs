use clap::{ArgAction, Parser};

use crate::protocol::DEFAULT_PORT;

/// CLI surface for the arena server (teacher's `Args` pattern, generalised
/// past the two-player-per-process-loop design to a lobby that can hold any
/// number of waiting and in-match clients at once).
#[derive(Parser, Debug)]
#[command(
    name = "server",
    version,
    about = "Turn-based combat arena — dedicated server",
    long_about = "Accepts any number of TCP clients, pairs them one-on-one, and \
                  arbitrates a deterministic turn-based combat protocol until \
                  one side's hit points reach zero.\n\
                  Protocol is line-delimited UTF-8; see src/protocol.rs for the wire format."
)]
pub struct Args {
    /// Address to listen on
    #[arg(short, long, default_value_t = format!("0.0.0.0:{DEFAULT_PORT}"))]
    pub bind: String,

    /// Increase output verbosity (-v verbose, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Seed the RNG deterministically instead of from OS entropy — for
    /// reproducible matches in tests and demos.
    #[arg(long)]
    pub seed: Option<u64>,
}
