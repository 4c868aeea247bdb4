use std::path::Path;

/// File stem as stored in the solution header, e.g. `P007` for `puzzles/P007.toml`.
pub fn puzzle_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
