use std::io::{self, Write};

use anyhow::{Context, Result};

use magnum_forge::{FeedShape, Pipeline, check_preconditions, normalize_puzzle};

use super::load_puzzle;
use crate::cli::InspectArgs;
use crate::config::build_solver_config;
use crate::display::{print_commands, print_molecules, print_pipeline, print_puzzle_info};

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let puzzle = load_puzzle(&args.puzzle)?;
    let config = build_solver_config(&args.solver)?;

    check_preconditions(&puzzle).context("Puzzle cannot be solved")?;
    let (normalized, repeating) = normalize_puzzle(&puzzle).context("Normalization failed")?;
    let mut pipeline =
        Pipeline::build(&normalized, &repeating, &config).context("Chemistry resolution failed")?;
    let commands = pipeline.run().context("Chemistry resolution failed")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    print_puzzle_info(&mut out, &normalized);
    print_molecules(&mut out, "Reagents", &normalized.reagents);
    let shapes: Vec<&str> = normalized
        .reagents
        .iter()
        .map(|m| FeedShape::classify(m).name())
        .collect();
    writeln!(out, "      Feeders: {}", shapes.join(", "))?;
    writeln!(out)?;
    print_molecules(&mut out, "Products", &normalized.products);
    print_pipeline(&mut out, &pipeline);
    print_commands(&mut out, &commands);

    out.flush()?;
    Ok(())
}
