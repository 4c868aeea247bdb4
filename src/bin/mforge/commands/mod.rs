mod dump;
mod inspect;
mod solve;

use dump::run_dump;
use inspect::run_inspect;
use solve::run_solve;

use anyhow::{Context as _, Result};

use magnum_forge::Puzzle;
use magnum_forge::io::read_puzzle;

use crate::cli::Command;
use crate::io::open_input;

pub fn dispatch(command: Command, interactive: bool) -> Result<()> {
    match command {
        Command::Solve(args) => run_solve(args, interactive),
        Command::Inspect(args) => run_inspect(args),
        Command::Dump(args) => run_dump(args),
    }
}

fn load_puzzle(path: &std::path::Path) -> Result<Puzzle> {
    let input = open_input(Some(path), "mforge solve <PUZZLE>")?;
    read_puzzle(input).with_context(|| format!("Failed to read puzzle: {}", path.display()))
}
