use clap::Parser;

use duel_arena::config::Args;
use duel_arena::logger::Logger;
use duel_arena::reactor;

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    let logger = Logger::new(args.verbose);
    reactor::run(args, logger).await
}
