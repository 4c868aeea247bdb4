use std::io::{self, Write};

use anyhow::{Context, Result};

use magnum_forge::io::write_solution;
use magnum_forge::{NodeKind, PuzzleSolution, solve};

use super::load_puzzle;
use crate::cli::SolveArgs;
use crate::config::{build_solver_config, strategy_name};
use crate::display::{Progress, print_puzzle_info, print_solution_info};
use crate::io::create_output;
use crate::util::path::puzzle_stem;

const TOTAL_STEPS: u8 = 3;

pub fn run_solve(args: SolveArgs, interactive: bool) -> Result<()> {
    let mut progress = Progress::new(interactive, TOTAL_STEPS);

    progress.step("Reading puzzle");
    let puzzle = load_puzzle(&args.puzzle)?;
    let config = build_solver_config(&args.solver)?;
    progress.complete_step(
        "Reading puzzle",
        &[
            format!(
                "{} reagent(s), {} product(s)",
                puzzle.reagents.len(),
                puzzle.products.len()
            ),
            format!(
                "Metal strategy: {}, replication: {}",
                strategy_name(config.metal_strategy),
                config.replication
            ),
        ],
    );

    if interactive {
        print_puzzle_info(&mut io::stderr().lock(), &puzzle);
    }

    progress.step("Synthesizing machine");
    let solution = solve(&puzzle, &config).context("Solve failed")?;
    progress.complete_step("Synthesizing machine", &synthesis_substeps(&solution));

    if interactive {
        print_solution_info(&mut io::stderr().lock(), &solution);
    }

    progress.step("Writing solution");
    let name = args.name.clone().unwrap_or_else(|| puzzle.name.clone());
    let mut writer = create_output(
        args.output.as_deref(),
        "mforge solve <PUZZLE> -o <SOLUTION> or pipe output.",
    )?;
    write_solution(&mut writer, &solution, &puzzle_stem(&args.puzzle), &name, None)
        .context("Failed to write solution")?;
    writer.flush().context("Failed to write solution")?;
    let target = args
        .output
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    progress.complete_step("Writing solution", &[format!("Write format 7 → {}", target)]);

    progress.finish();
    Ok(())
}

fn synthesis_substeps(solution: &PuzzleSolution) -> Vec<String> {
    let tree = &solution.tree;
    let feeders = tree.count(|k| matches!(k, NodeKind::Reagent { .. }));
    let outputs = tree.count(|k| matches!(k, NodeKind::Product { .. }));
    let mut steps = vec![
        format!(
            "Resolve chemistry ({} command(s))",
            solution.commands.len()
        ),
        format!(
            "Place {} arm(s): {} feeder(s), {} product marker(s)",
            solution.arm_count(),
            feeders,
            outputs
        ),
        format!(
            "Schedule {} instruction(s)",
            solution.program.instruction_count()
        ),
    ];
    if solution.parts.glyphs_removed + solution.parts.tracks_removed + solution.parts.tracks_trimmed > 0 {
        steps.push(format!(
            "Prune {} glyph(s), trim {} track(s)",
            solution.parts.glyphs_removed,
            solution.parts.tracks_removed + solution.parts.tracks_trimmed
        ));
    }
    steps
}
