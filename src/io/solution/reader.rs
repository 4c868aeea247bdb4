use super::writer::Metric;
use crate::io::{Format, SOLUTION_VERSION, error::Error};
use crate::model::hex::HexPos;
use crate::model::program::Instruction;
use std::io::Read;

/// A solution file as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionRecord {
    pub version: i32,
    /// Puzzle file name the solution belongs to.
    pub puzzle: String,
    pub name: String,
    /// Empty for an unsolved solution.
    pub metrics: Vec<(Metric, i32)>,
    pub objects: Vec<ObjectRecord>,
}

/// One placed part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub type_name: String,
    pub position: HexPos,
    pub extension: i32,
    pub rotation: i32,
    /// Reagent or product index; 0 for other parts.
    pub id: i32,
    pub instructions: Vec<(i32, Instruction)>,
    /// Track cells relative to `position`, tracks only.
    pub track: Vec<HexPos>,
    pub arm: i32,
}

impl ObjectRecord {
    pub fn is_arm(&self) -> bool {
        matches!(
            self.type_name.as_str(),
            "arm1" | "arm2" | "arm3" | "arm6" | "piston" | "baron"
        )
    }
}

/// Reads a solution written by [`write_solution`](crate::io::write_solution).
pub fn read_solution<R: Read>(reader: R) -> Result<SolutionRecord, Error> {
    let mut decoder = Decoder { reader, offset: 0 };

    let version = decoder.i32()?;
    if version != SOLUTION_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    let puzzle = decoder.string()?;
    let name = decoder.string()?;

    let metric_count = decoder.len()?;
    let mut metrics = Vec::with_capacity(metric_count);
    for _ in 0..metric_count {
        let at = decoder.offset;
        let code = decoder.i32()?;
        let metric = Metric::from_code(code)
            .ok_or_else(|| decoder.error_at(at, format!("unknown metric kind {}", code)))?;
        metrics.push((metric, decoder.i32()?));
    }

    let object_count = decoder.len()?;
    let mut objects = Vec::with_capacity(object_count.min(4096));
    for _ in 0..object_count {
        objects.push(decoder.object()?);
    }

    Ok(SolutionRecord {
        version,
        puzzle,
        name,
        metrics,
        objects,
    })
}

struct Decoder<R> {
    reader: R,
    offset: usize,
}

impl<R: Read> Decoder<R> {
    fn error_at(&self, offset: usize, details: impl Into<String>) -> Error {
        Error::parse(Format::Solution, format!("byte {}", offset), details)
    }

    fn bytes<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut buf = [0u8; N];
        self.reader.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                self.error_at(self.offset, "unexpected end of data")
            } else {
                Error::from(e)
            }
        })?;
        self.offset += N;
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.bytes::<1>()?[0])
    }

    fn i32(&mut self) -> Result<i32, Error> {
        Ok(i32::from_le_bytes(self.bytes::<4>()?))
    }

    fn len(&mut self) -> Result<usize, Error> {
        let at = self.offset;
        let n = self.i32()?;
        usize::try_from(n).map_err(|_| self.error_at(at, format!("negative count {}", n)))
    }

    fn string(&mut self) -> Result<String, Error> {
        let at = self.offset;
        let mut len = 0usize;
        let mut shift = 0;
        loop {
            let byte = self.u8()?;
            len |= usize::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift > 28 {
                return Err(self.error_at(at, "string length prefix is too long"));
            }
        }
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                self.error_at(at, "string runs past the end of data")
            } else {
                Error::from(e)
            }
        })?;
        self.offset += len;
        String::from_utf8(buf).map_err(|_| self.error_at(at, "string is not UTF-8"))
    }

    fn object(&mut self) -> Result<ObjectRecord, Error> {
        let type_name = self.string()?;
        let _flag = self.u8()?;
        let position = HexPos::new(self.i32()?, self.i32()?);
        let extension = self.i32()?;
        let rotation = self.i32()?;
        let id = self.i32()?;

        let count = self.len()?;
        let mut instructions = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            let cycle = self.i32()?;
            let at = self.offset;
            let code = self.u8()?;
            let instruction = Instruction::from_code(code).ok_or_else(|| {
                self.error_at(at, format!("unknown opcode '{}'", code as char))
            })?;
            instructions.push((cycle, instruction));
        }

        let mut track = Vec::new();
        if type_name == "track" {
            let cells = self.len()?;
            for _ in 0..cells {
                track.push(HexPos::new(self.i32()?, self.i32()?));
            }
        }
        let arm = self.i32()?;

        Ok(ObjectRecord {
            type_name,
            position,
            extension,
            rotation,
            id,
            instructions,
            track,
            arm,
        })
    }
}
