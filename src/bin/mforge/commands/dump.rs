use std::io::{self, Write};

use anyhow::{Context, Result};

use magnum_forge::io::read_solution;

use crate::cli::DumpArgs;
use crate::display::{print_objects, print_programs, print_solution_header};
use crate::io::open_input;

pub fn run_dump(args: DumpArgs) -> Result<()> {
    let input = open_input(
        args.solution.as_deref(),
        "mforge dump <SOLUTION> or pipe a solution via stdin.",
    )?;
    let record = read_solution(input).context("Failed to read solution")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_solution_header(&mut out, &record);
    print_objects(&mut out, &record);
    if args.programs {
        print_programs(&mut out, &record);
    }
    out.flush()?;
    Ok(())
}
