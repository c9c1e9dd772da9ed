use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// NetWarden - pauses bandwidth-hungry background processes and holds off OS
/// updates while you play
#[derive(Parser, Debug)]
#[command(name = "netwarden")]
#[command(version)]
#[command(about = "Network usage watchdog for gaming sessions", long_about = None)]
struct Args {
    /// Enter gaming mode immediately after startup
    #[arg(long)]
    gaming: bool,

    /// Turn automatic gaming mode on or off (persisted)
    #[arg(long, value_name = "STATE")]
    auto_gaming: Option<Toggle>,

    /// Keep rules, state, and logs under this directory instead of the platform defaults
    #[arg(long, value_name = "DIR")]
    home: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Toggle {
    On,
    Off,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    netwarden_lib::run(netwarden_lib::RunOptions {
        home: args.home,
        gaming: args.gaming,
        auto_gaming: args.auto_gaming.map(|t| matches!(t, Toggle::On)),
    })
}
