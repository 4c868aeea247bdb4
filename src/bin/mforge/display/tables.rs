use std::collections::BTreeMap;
use std::io::Write;

use magnum_forge::io::{ObjectRecord, SolutionRecord};
use magnum_forge::{
    CommandKind, CommandSequence, Element, ElementSet, Molecule, NodeKind, Pipeline, Puzzle,
    PuzzleSolution,
};

use crate::util::text::truncate;

const INDENT: &str = "      ";

const BOX_INNER_WIDTH: usize = 62;
const SAFE_TABLE_WIDTH: usize = BOX_INNER_WIDTH - INDENT.len();

pub fn print_puzzle_info(out: &mut impl Write, puzzle: &Puzzle) {
    let repeating = puzzle.products.iter().filter(|p| p.has_repeats()).count();
    let rows = vec![
        ("Name", puzzle.name.clone()),
        ("Reagents", puzzle.reagents.len().to_string()),
        ("Products", puzzle.products.len().to_string()),
        ("Repeating", repeating.to_string()),
        (
            "Mechanisms",
            format!("{} allowed", puzzle.allowed_mechanisms.len()),
        ),
        ("Glyphs", format!("{} allowed", puzzle.allowed_glyphs.len())),
    ];
    print_kv_table(out, "Puzzle Summary", &rows);
}

/// Draws each molecule on the lattice, top row first; each row up is
/// shifted half a cell to the right.
pub fn print_molecules(out: &mut impl Write, title: &str, molecules: &[Molecule]) {
    let _ = writeln!(out, "{}┌─ {} ─┐", INDENT, truncate(title, SAFE_TABLE_WIDTH - 6));
    for (i, molecule) in molecules.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}  [{}] {} atom(s), {} bond(s), {}×{}",
            INDENT,
            i,
            molecule.atom_count(),
            molecule.bonds().len(),
            molecule.width(),
            molecule.height()
        );
        for (r, row) in molecule.rows().into_iter().rev() {
            let mut line = " ".repeat(r.max(0) as usize * 2);
            let mut cursor = 0;
            let mut cells: Vec<_> = row.iter().map(|&i| &molecule.atoms()[i]).collect();
            cells.sort_by_key(|a| a.position.q);
            for atom in cells {
                let q = atom.position.q.max(0);
                while cursor < q {
                    line.push_str("    ");
                    cursor += 1;
                }
                line.push_str(&format!("{:<4}", symbol(atom.element)));
                cursor += 1;
            }
            let _ = writeln!(out, "{}    {}", INDENT, line.trim_end());
        }
    }
    let _ = writeln!(out);
}

pub fn print_pipeline(out: &mut impl Write, pipeline: &Pipeline) {
    let mut rows: Vec<Vec<String>> = pipeline
        .stages()
        .iter()
        .enumerate()
        .map(|(i, stage)| vec![i.to_string(), stage.node.name(), element_list(stage.outputs)])
        .collect();
    let products = pipeline.output().products();
    rows.push(vec![
        pipeline.stages().len().to_string(),
        "output".to_string(),
        format!(
            "{} product(s), {} round(s)",
            products.len(),
            products.iter().map(|p| p.rounds).max().unwrap_or(0)
        ),
    ]);
    print_table(
        out,
        "Pipeline",
        &[("#", 3, Align::Right), ("Stage", 26, Align::Left), ("Outputs", 20, Align::Left)],
        &rows,
    );
}

pub fn print_commands(out: &mut impl Write, commands: &CommandSequence) {
    let rows = vec![
        ("Commands", commands.len().to_string()),
        ("Generate", commands.count(CommandKind::Generate).to_string()),
        ("Consume", commands.count(CommandKind::Consume).to_string()),
        (
            "Buffered",
            commands.count(CommandKind::PrepareToGenerate).to_string(),
        ),
        (
            "Balanced",
            if commands.is_balanced() { "yes" } else { "no" }.to_string(),
        ),
    ];
    print_kv_table(out, "Command Sequence", &rows);

    let mut per_element: BTreeMap<Element, (usize, usize)> = BTreeMap::new();
    for command in commands.commands() {
        let entry = per_element.entry(command.element).or_default();
        match command.kind {
            CommandKind::Generate => entry.0 += 1,
            CommandKind::Consume => entry.1 += 1,
            CommandKind::PrepareToGenerate => {}
        }
    }
    let rows: Vec<Vec<String>> = per_element
        .into_iter()
        .map(|(element, (generated, consumed))| {
            vec![element.name().to_string(), generated.to_string(), consumed.to_string()]
        })
        .collect();
    print_table(
        out,
        "Atoms by Element",
        &[
            ("Element", 14, Align::Left),
            ("Generated", 10, Align::Right),
            ("Consumed", 10, Align::Right),
        ],
        &rows,
    );
}

pub fn print_solution_info(out: &mut impl Write, solution: &PuzzleSolution) {
    let estimate = solution.estimate();
    let tree = &solution.tree;
    let glyphs = tree.count(|k| matches!(k, NodeKind::Glyph { .. }));
    let tracks = tree.count(|k| matches!(k, NodeKind::Track { .. }));
    let rows = vec![
        ("Arms", solution.arm_count().to_string()),
        ("Glyphs", glyphs.to_string()),
        ("Tracks", tracks.to_string()),
        ("Cost", estimate.cost.to_string()),
        ("Instructions", estimate.instructions.to_string()),
        (
            "Last Cycle",
            estimate
                .last_cycle
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Cells", estimate.cells.to_string()),
        (
            "Pruned",
            format!(
                "{} glyph(s), {} track(s)",
                solution.parts.glyphs_removed, solution.parts.tracks_removed
            ),
        ),
    ];
    print_kv_table(out, "Solution Summary", &rows);
}

pub fn print_solution_header(out: &mut impl Write, record: &SolutionRecord) {
    let metrics = if record.metrics.is_empty() {
        "unsolved".to_string()
    } else {
        record
            .metrics
            .iter()
            .map(|(m, v)| format!("{:?}={}", m, v).to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    };
    let rows = vec![
        ("Puzzle", record.puzzle.clone()),
        ("Name", record.name.clone()),
        ("Version", record.version.to_string()),
        ("Metrics", metrics),
        ("Objects", record.objects.len().to_string()),
    ];
    print_kv_table(out, "Solution File", &rows);
}

pub fn print_objects(out: &mut impl Write, record: &SolutionRecord) {
    let rows: Vec<Vec<String>> = record
        .objects
        .iter()
        .map(|o| {
            let tag = if o.is_arm() {
                format!("arm#{}", o.arm)
            } else if o.type_name == "track" {
                format!("{} cell(s)", o.track.len())
            } else {
                o.id.to_string()
            };
            vec![
                o.type_name.clone(),
                format!("{}", o.position),
                o.rotation.to_string(),
                o.extension.to_string(),
                tag,
                o.instructions.len().to_string(),
            ]
        })
        .collect();
    print_table(
        out,
        "Objects",
        &[
            ("Type", 16, Align::Left),
            ("Position", 9, Align::Left),
            ("Rot", 3, Align::Right),
            ("Ext", 3, Align::Right),
            ("Id", 9, Align::Left),
            ("Instr", 5, Align::Right),
        ],
        &rows,
    );
}

/// One line per arm: its opcodes laid out by cycle, `.` for idle cycles.
pub fn print_programs(out: &mut impl Write, record: &SolutionRecord) {
    let arms: Vec<&ObjectRecord> = record.objects.iter().filter(|o| o.is_arm()).collect();
    let Some(last) = arms
        .iter()
        .filter_map(|o| o.instructions.last().map(|&(c, _)| c))
        .max()
    else {
        return;
    };
    let _ = writeln!(out, "{}┌─ Programs ─┐", INDENT);
    for arm in arms {
        let mut line = vec!['.'; last.max(0) as usize + 1];
        for &(cycle, instruction) in &arm.instructions {
            if let (Ok(at), Some(code)) = (usize::try_from(cycle), instruction.code()) {
                if let Some(slot) = line.get_mut(at) {
                    *slot = code as char;
                }
            }
        }
        let _ = writeln!(
            out,
            "{}  {:<8} {}",
            INDENT,
            format!("arm#{}", arm.arm),
            line.into_iter().collect::<String>()
        );
    }
    let _ = writeln!(out);
}

fn symbol(element: Element) -> &'static str {
    match element {
        Element::Salt => "Sa",
        Element::Air => "Ai",
        Element::Earth => "Ea",
        Element::Fire => "Fi",
        Element::Water => "Wa",
        Element::Quicksilver => "Qs",
        Element::Gold => "Au",
        Element::Silver => "Ag",
        Element::Copper => "Cu",
        Element::Iron => "Fe",
        Element::Tin => "Sn",
        Element::Lead => "Pb",
        Element::Vitae => "Vi",
        Element::Mors => "Mo",
        Element::Repeat => "..",
        Element::Quintessence => "Qu",
    }
}

fn element_list(set: ElementSet) -> String {
    set.iter().map(symbol).collect::<Vec<_>>().join(" ")
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

fn print_table(
    out: &mut impl Write,
    title: &str,
    columns: &[(&str, usize, Align)],
    rows: &[Vec<String>],
) {
    let rule = |left: &str, mid: &str, right: &str| {
        let parts: Vec<String> = columns.iter().map(|(_, w, _)| "─".repeat(w + 2)).collect();
        format!("{}{}{}{}", INDENT, left, parts.join(mid), right)
    };
    let line = |cells: Vec<String>| {
        let parts: Vec<String> = columns
            .iter()
            .zip(cells)
            .map(|(&(_, w, align), cell)| {
                let cell = truncate(&cell, w);
                match align {
                    Align::Left => format!(" {:<w$} ", cell, w = w),
                    Align::Right => format!(" {:>w$} ", cell, w = w),
                }
            })
            .collect();
        format!("{}│{}│", INDENT, parts.join("│"))
    };

    let _ = writeln!(out, "{}┌─ {} ─┐", INDENT, truncate(title, SAFE_TABLE_WIDTH - 6));
    let _ = writeln!(out, "{}", rule("┌", "┬", "┐"));
    let _ = writeln!(
        out,
        "{}",
        line(columns.iter().map(|(h, _, _)| h.to_string()).collect())
    );
    let _ = writeln!(out, "{}", rule("├", "┼", "┤"));
    for row in rows {
        let _ = writeln!(out, "{}", line(row.clone()));
    }
    let _ = writeln!(out, "{}", rule("└", "┴", "┘"));
}

fn print_kv_table(out: &mut impl Write, title: &str, rows: &[(&str, String)]) {
    let key_w = 16usize;
    let sep_overhead = 6;
    let val_w = SAFE_TABLE_WIDTH.saturating_sub(key_w + sep_overhead);
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|(k, v)| vec![k.to_string(), v.clone()])
        .collect();
    print_table(
        out,
        title,
        &[("Metric", key_w, Align::Left), ("Value", val_w, Align::Right)],
        &rows,
    );
}
