use std::io::{self, Write};

use anyhow::Error;

use crate::util::text::wrap;

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "   ╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(stderr, "   ║  ✗ Error                                                     ║");
    let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");

    for line in wrap(&err.to_string(), 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Caused by:                                                  ║");
        for line in wrap(&cause.to_string(), 57) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
        source = cause.source();
    }

    let hints = HintCollector::collect(err);
    if !hints.is_empty() {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Hints:                                                      ║");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "   ╚══════════════════════════════════════════════════════════════╝");
    let _ = writeln!(stderr);
}

struct HintCollector {
    hints: Vec<String>,
    has_typed_hints: bool,
}

impl HintCollector {
    fn collect(err: &Error) -> Vec<String> {
        let mut collector = Self {
            hints: Vec::new(),
            has_typed_hints: false,
        };

        collector.collect_io_hints(err);
        collector.collect_solve_hints(err);

        if !collector.has_typed_hints {
            collector.collect_fallback_hints(err);
        }
        collector.hints
    }

    fn add(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    fn collect_io_hints(&mut self, err: &Error) {
        use magnum_forge::io::{Error as IoError, Format};

        let Some(io_err) = err.downcast_ref::<IoError>() else {
            return;
        };
        self.has_typed_hints = true;

        match io_err {
            IoError::Io { source } => self.collect_std_io_hints(source),

            IoError::Parse {
                format: Format::Puzzle,
                location,
                ..
            } => {
                self.add(format!("Check the entry at '{}' in the puzzle file", location));
                self.add("Element names: salt, air, earth, fire, water, quicksilver, lead … gold, vitae, mors, quintessence, repeat");
                self.add("Bonds must join two atoms on neighboring cells");
            }

            IoError::Parse {
                format: Format::Solution,
                ..
            } => {
                self.add("The solution file is truncated or was not written by a compatible tool");
            }

            IoError::Toml(_) => {
                self.add("The puzzle file has invalid TOML syntax");
                self.add("Molecules are [[reagents]] / [[products]] tables with [[...atoms]] and [[...bonds]] entries");
            }

            IoError::UnsupportedVersion(version) => {
                self.add(format!("The file uses solution format version {}", version));
                self.add("Only version 7 files can be read");
            }

            IoError::OutOfRange(_) => {
                self.add("A position, cycle, or count does not fit the solution format");
                self.add("This may indicate a bug; please report if reproducible");
            }
        }
    }

    fn collect_std_io_hints(&mut self, source: &std::io::Error) {
        use std::io::ErrorKind;

        match source.kind() {
            ErrorKind::NotFound => {
                self.add("File or directory not found");
                self.add("Check the path spelling and ensure the file exists");
            }

            ErrorKind::PermissionDenied => {
                self.add("Permission denied accessing the file");
                self.add("Ensure you have read/write access as needed");
            }

            ErrorKind::UnexpectedEof => {
                self.add("Unexpected end of file encountered");
                self.add("The file may be truncated or incomplete");
            }

            ErrorKind::BrokenPipe => {
                self.add("Broken pipe: the output consumer terminated");
            }

            _ => {
                self.add("I/O operation failed");
                self.add("Check file path, permissions, and disk space");
            }
        }
    }

    fn collect_solve_hints(&mut self, err: &Error) {
        use magnum_forge::SolveError;

        let Some(solve_err) = err.downcast_ref::<SolveError>() else {
            return;
        };
        self.has_typed_hints = true;

        match solve_err {
            SolveError::ConfigParse(_) => {
                self.add("The solver config has invalid TOML or unknown values");
                self.add("metal_strategy is one of: auto, projection, purification");
            }

            SolveError::InvalidConfig(_) => {
                self.add("replication must be 1 or more");
            }

            SolveError::Precondition(_) => {
                self.add("The puzzle is outside what the solver can build");
                self.add("Triplex bonds are only supported between fire atoms");
            }

            SolveError::Resolution { .. } => {
                self.add("No reagent or transmutation reaches the requested element");
                self.add("Vitae and mors must be supplied by a reagent");
                self.add("Run 'mforge inspect' to see which stages were built");
            }

            SolveError::MissingGlyph { glyph, .. } => {
                self.add(format!("Add \"{}\" to allowed_glyphs if the puzzle permits it", glyph.name()));
            }

            SolveError::MissingMechanism { mechanism, .. } => {
                self.add(format!(
                    "Add \"{}\" to allowed_mechanisms if the puzzle permits it",
                    mechanism.name()
                ));
            }

            SolveError::Assembly { .. } => {
                self.add("The product shape needs a bonder layout or lift the builder cannot produce");
                self.add("Products with a component that does not reach their top row are not supported");
            }

            SolveError::Collision(_) => {
                self.add("A planned motion sweeps through an occupied cell");
                self.add("Try --no-collision-check to write the program anyway");
            }

            SolveError::Scheduling(_) => {
                self.add("Internal scheduling invariant violated");
                self.add("This may indicate a bug; please report if reproducible");
            }
        }
    }

    fn collect_fallback_hints(&mut self, err: &Error) {
        let msg = error_chain_text(err);

        if msg.contains("terminal") || msg.contains("stdout") {
            self.add("Solutions are binary; write them with -o/--output or pipe them");
            return;
        }

        if msg.contains("no such file") || msg.contains("not found") {
            self.add("Check that the file path is correct");
            self.add("Verify the file exists and is readable");
        }
    }
}

fn error_chain_text(err: &Error) -> String {
    let mut text = err.to_string();

    let mut source = err.source();
    while let Some(cause) = source {
        text.push('\n');
        text.push_str(&cause.to_string());
        source = cause.source();
    }

    text.to_lowercase()
}
