use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "mforge",
    about = "Compile alchemy puzzles into synchronized arm programs",
    version,
    author,
    before_help = crate::display::banner_for_help(),
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG otherwise
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Solve a puzzle and write the binary solution
    #[command(visible_alias = "s")]
    Solve(SolveArgs),

    /// Show the normalized puzzle and its chemistry without building anything
    #[command(visible_alias = "i")]
    Inspect(InspectArgs),

    /// Print the parts and programs stored in a solution file
    #[command(visible_alias = "d")]
    Dump(DumpArgs),
}

/// Solver options shared by solve and inspect.
#[derive(Args)]
#[command(next_help_heading = "Solver Options")]
pub struct SolverOptions {
    /// Solver configuration (TOML file); flags below override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How metals no reagent supplies are produced
    #[arg(long = "metal-strategy", value_name = "STRATEGY")]
    pub metal_strategy: Option<MetalStrategyArg>,

    /// Rounds of each non-repeating product when other products repeat
    #[arg(long, value_name = "N")]
    pub replication: Option<u32>,

    /// Largest number of single-atom products sharing one output carrier
    #[arg(long = "single-output-limit", value_name = "N")]
    pub single_output_limit: Option<usize>,

    /// Skip swept-motion collision checks
    #[arg(long = "no-collision-check")]
    pub no_collision_check: bool,

    /// Keep unused glyphs and full-length tracks
    #[arg(long = "no-optimize")]
    pub no_optimize: bool,
}

#[derive(Args)]
pub struct SolveArgs {
    /// Puzzle description (TOML)
    #[arg(value_name = "PUZZLE")]
    pub puzzle: PathBuf,

    /// Solution file (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Solution name stored in the file (defaults to the puzzle name)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,

    #[command(flatten)]
    pub solver: SolverOptions,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Puzzle description (TOML)
    #[arg(value_name = "PUZZLE")]
    pub puzzle: PathBuf,

    /// Suppress the banner
    #[arg(short, long)]
    pub quiet: bool,

    #[command(flatten)]
    pub solver: SolverOptions,
}

#[derive(Args)]
pub struct DumpArgs {
    /// Solution file (stdin if omitted)
    #[arg(value_name = "SOLUTION")]
    pub solution: Option<PathBuf>,

    /// Also list every instruction of every arm
    #[arg(long)]
    pub programs: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MetalStrategyArg {
    /// Projection when quicksilver is available, otherwise purification
    Auto,
    /// One projection glyph fed quicksilver per rank step
    Projection,
    /// One purification glyph per rank step
    Purification,
}

pub fn parse() -> Cli {
    Cli::parse()
}
