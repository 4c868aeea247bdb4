mod banner;
mod error;
mod progress;
mod tables;

pub use banner::{banner_for_help, print_banner};
pub use error::print_error;
pub use progress::Progress;
pub use tables::{
    print_commands, print_molecules, print_objects, print_pipeline, print_programs,
    print_puzzle_info, print_solution_header, print_solution_info,
};
