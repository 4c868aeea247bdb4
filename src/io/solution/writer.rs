use super::reader::{ObjectRecord, SolutionRecord};
use crate::io::{SOLUTION_VERSION, error::Error};
use crate::model::hex::{HexPos, Pose};
use crate::model::program::Instruction;
use crate::model::tree::NodeKind;
use crate::solver::PuzzleSolution;
use std::io::Write;

/// Scored figures of a simulated solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub cycles: i32,
    pub cost: i32,
    pub area: i32,
    pub instructions: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Cycles,
    Cost,
    Area,
    Instructions,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Cycles,
        Metric::Cost,
        Metric::Area,
        Metric::Instructions,
    ];

    pub fn code(self) -> i32 {
        match self {
            Metric::Cycles => 0,
            Metric::Cost => 1,
            Metric::Area => 2,
            Metric::Instructions => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.code() == code)
    }
}

impl Metrics {
    pub fn get(&self, metric: Metric) -> i32 {
        match metric {
            Metric::Cycles => self.cycles,
            Metric::Cost => self.cost,
            Metric::Area => self.area,
            Metric::Instructions => self.instructions,
        }
    }
}

/// Writes `solution` in the binary solution format.
///
/// Without `metrics` the solution is written as unsolved (no metric
/// pairs).
pub fn write_solution<W: Write>(
    mut writer: W,
    solution: &PuzzleSolution,
    puzzle_file: &str,
    name: &str,
    metrics: Option<&Metrics>,
) -> Result<(), Error> {
    let record = SolutionRecord {
        version: SOLUTION_VERSION,
        puzzle: puzzle_file.to_string(),
        name: name.to_string(),
        metrics: metrics
            .map(|m| Metric::ALL.iter().map(|&k| (k, m.get(k))).collect())
            .unwrap_or_default(),
        objects: object_records(solution)?,
    };
    encode(&mut writer, &record)?;
    writer.flush()?;
    Ok(())
}

fn object_records(solution: &PuzzleSolution) -> Result<Vec<ObjectRecord>, Error> {
    let mut objects = Vec::new();
    for (id, node) in solution.tree.iter() {
        let Some(pose) = solution.tree.world_pose(id) else {
            continue;
        };
        let mut record = ObjectRecord {
            type_name: String::new(),
            position: pose.position,
            extension: 1,
            rotation: i32::from(pose.rotation.steps()),
            id: 0,
            instructions: Vec::new(),
            track: Vec::new(),
            arm: 0,
        };
        match &node.kind {
            NodeKind::Frame => continue,
            NodeKind::Arm {
                kind,
                extension,
                id: arm,
            } => {
                record.type_name = kind.type_name().to_string();
                record.extension = *extension;
                record.arm = to_i32(arm.0, "arm index")?;
                if let Some(stream) = solution.program.stream(*arm) {
                    for (&cycle, &instruction) in stream {
                        if !matches!(instruction, Instruction::Noop | Instruction::Wait) {
                            record.instructions.push((to_i32(cycle, "cycle")?, instruction));
                        }
                    }
                }
            }
            NodeKind::Track { path } => {
                record.type_name = "track".to_string();
                let orientation = Pose::new(HexPos::ORIGIN, pose.rotation);
                record.track = path.iter().map(|&p| orientation.apply(p)).collect();
            }
            NodeKind::Glyph { kind } => {
                record.type_name = kind.type_name().to_string();
            }
            NodeKind::Reagent { index } => {
                record.type_name = "input".to_string();
                record.id = to_i32(*index, "reagent index")?;
            }
            NodeKind::Product { index, repeating } => {
                record.type_name = if *repeating { "out-rep" } else { "out-std" }.to_string();
                record.id = to_i32(*index, "product index")?;
            }
        }
        objects.push(record);
    }
    Ok(objects)
}

fn to_i32<T>(value: T, what: &str) -> Result<i32, Error>
where
    T: TryInto<i32> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .map_err(|_| Error::OutOfRange(format!("{} {}", what, value)))
}

fn encode<W: Write>(w: &mut W, record: &SolutionRecord) -> Result<(), Error> {
    put_i32(w, record.version)?;
    put_str(w, &record.puzzle)?;
    put_str(w, &record.name)?;

    put_len(w, record.metrics.len())?;
    for &(metric, value) in &record.metrics {
        put_i32(w, metric.code())?;
        put_i32(w, value)?;
    }

    put_len(w, record.objects.len())?;
    for object in &record.objects {
        put_str(w, &object.type_name)?;
        w.write_all(&[1])?;
        put_i32(w, object.position.q)?;
        put_i32(w, object.position.r)?;
        put_i32(w, object.extension)?;
        put_i32(w, object.rotation)?;
        put_i32(w, object.id)?;
        put_len(w, object.instructions.len())?;
        for &(cycle, instruction) in &object.instructions {
            let code = instruction
                .code()
                .ok_or_else(|| Error::OutOfRange(format!("{:?} has no opcode", instruction)))?;
            put_i32(w, cycle)?;
            w.write_all(&[code])?;
        }
        if object.type_name == "track" {
            put_len(w, object.track.len())?;
            for cell in &object.track {
                put_i32(w, cell.q)?;
                put_i32(w, cell.r)?;
            }
        }
        put_i32(w, object.arm)?;
    }
    Ok(())
}

fn put_i32<W: Write>(w: &mut W, value: i32) -> Result<(), Error> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn put_len<W: Write>(w: &mut W, len: usize) -> Result<(), Error> {
    put_i32(w, to_i32(len, "length")?)
}

/// Length prefix is a 7-bit variable-length integer, low groups first.
fn put_str<W: Write>(w: &mut W, s: &str) -> Result<(), Error> {
    let mut len = s.len();
    loop {
        let low = (len & 0x7f) as u8;
        len >>= 7;
        if len == 0 {
            w.write_all(&[low])?;
            break;
        }
        w.write_all(&[low | 0x80])?;
    }
    w.write_all(s.as_bytes())?;
    Ok(())
}
