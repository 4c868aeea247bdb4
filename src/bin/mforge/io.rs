//! Puzzle and solution streams: a named file, or a pipe.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, IsTerminal, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

/// Whether progress and summaries go to stderr.
///
/// `--quiet` and redirected stderr both turn them off.
pub fn is_interactive(quiet: bool) -> bool {
    !quiet && io::stderr().is_terminal()
}

/// Reads `path`, or stdin when it is piped.
pub fn open_input(path: Option<&Path>, usage: &str) -> Result<Box<dyn Read>> {
    match path {
        Some(p) => {
            let file = File::open(p)
                .with_context(|| format!("Failed to open input file: {}", p.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None if io::stdin().is_terminal() => {
            bail!("No input file specified and stdin is a terminal.\n\nUsage: {}", usage)
        }
        None => Ok(Box::new(BufReader::new(io::stdin().lock()))),
    }
}

/// Writes `path`, or stdout when it is piped. Solutions are binary, so a
/// terminal stdout is refused.
pub fn create_output(path: Option<&Path>, usage: &str) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file = File::create(p)
                .with_context(|| format!("Failed to create output file: {}", p.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None if io::stdout().is_terminal() => {
            bail!("No output file specified and stdout is a terminal.\n\nUsage: {}", usage)
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}
