use std::io::{self, Write};
use std::sync::LazyLock;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const BANNER_ART: &str = r#"
       __  __    _    ____ _   _ _   _ __  __
      |  \/  |  / \  / ___| \ | | | | |  \/  |
      | |\/| | / _ \| |  _|  \| | | | | |\/| |
      | |  | |/ ___ \ |_| | |\  | |_| | |  | |
      |_|  |_/_/   \_\____|_| \_|\___/|_|  |_|
                     _____ ___  ____   ____ _____
                    |  ___/ _ \|  _ \ / ___| ____|
                    | |_ | | | | |_) | |  _|  _|
                    |  _|| |_| |  _ <| |_| | |___
                    |_|   \___/|_| \_\\____|_____|

   ───────────────────────────────────────────────────────────
   "#;

static BANNER_FOR_HELP: LazyLock<String> = LazyLock::new(|| format!("\n{BANNER_ART}"));

pub fn banner_for_help() -> &'static str {
    &BANNER_FOR_HELP
}

pub fn print_banner() {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "{BANNER_ART}");
    let _ = writeln!(
        stderr,
        "   Alchemy Puzzle Compiler                          v{VERSION}"
    );
    let _ = writeln!(stderr);
}
