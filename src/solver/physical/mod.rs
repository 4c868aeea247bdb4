//! Physical program synthesis.
//!
//! Every element generator in the pipeline owns one station on a conveyor
//! running along lattice row `r = 0`. Station `i + 1` starts where station
//! `i` ends; atoms enter a station at its local `(0, 0)` and leave at
//! `(W, 0)`. Replaying the command sequence drives each station's carrier
//! through the routines that realize every Generate and Consume, passing
//! atoms through the stations in between.

mod assembler;
mod bonds;
mod carrier;
mod disassembler;
mod stations;
mod workpiece;

use std::collections::{BTreeSet, HashMap};

use log::{debug, trace};

pub use assembler::{RowAssembler, SingleOutput};
pub use carrier::Carrier;
pub use disassembler::{FeedShape, Feeder};
pub use stations::{
    BufferStation, ProjectionStation, PurificationStation, QuintessenceStation, SaltStation,
    VanBerloStation,
};

use super::commands::{Command, CommandKind, CommandSequence, GeneratorId};
use super::config::SolverConfig;
use super::elements::{ElementNode, MetalMethod, Pipeline};
use super::error::Error;
use super::writer::ProgramWriter;
use crate::model::hex::{HexPos, Pose};
use crate::model::puzzle::Puzzle;
use crate::model::tree::{ArmId, NodeId, NodeKind, ObjectTree};
use crate::model::types::{GlyphKind, MechanismKind};

/// State shared by every station while a solution is synthesized.
pub struct SynthesisContext<'a> {
    pub puzzle: &'a Puzzle,
    pub config: &'a SolverConfig,
    pub tree: ObjectTree,
    pub writer: ProgramWriter,
    next_arm: u32,
    used: BTreeSet<NodeId>,
}

impl<'a> SynthesisContext<'a> {
    pub fn new(puzzle: &'a Puzzle, config: &'a SolverConfig) -> Self {
        Self {
            puzzle,
            config,
            tree: ObjectTree::new(),
            writer: ProgramWriter::new(),
            next_arm: 0,
            used: BTreeSet::new(),
        }
    }

    /// Hands out arm identifiers in creation order.
    pub fn next_arm(&mut self) -> ArmId {
        let id = ArmId(self.next_arm);
        self.next_arm += 1;
        id
    }

    pub fn require_mechanism(&self, kind: MechanismKind, detail: &str) -> Result<(), Error> {
        if self.puzzle.allows_mechanism(kind) {
            Ok(())
        } else {
            Err(Error::missing_mechanism(kind, detail))
        }
    }

    pub fn add_frame(&mut self, origin: HexPos) -> NodeId {
        self.tree.add(None, Pose::at(origin), NodeKind::Frame)
    }

    /// Places a glyph under `frame`.
    ///
    /// Bonding and unbonding glyphs are checked against the puzzle after
    /// synthesis, once it is known which of them survive; every other
    /// kind must be allowed here.
    pub fn add_glyph(&mut self, frame: NodeId, pose: Pose, kind: GlyphKind) -> Result<NodeId, Error> {
        if !kind.is_bonder() && !self.puzzle.allows_glyph(kind) {
            return Err(Error::missing_glyph(kind, "needed by a station layout"));
        }
        Ok(self.tree.add(Some(frame), pose, NodeKind::Glyph { kind }))
    }

    /// Records that a glyph took part in at least one transformation.
    pub fn mark_used(&mut self, glyph: NodeId) {
        self.used.insert(glyph);
    }

    pub fn used_glyphs(&self) -> &BTreeSet<NodeId> {
        &self.used
    }
}

/// Physical counterpart of an element generator.
pub trait AtomStation {
    fn name(&self) -> String;

    fn carrier(&self) -> &Carrier;

    fn carrier_mut(&mut self) -> &mut Carrier;

    /// Produces an atom and leaves it on the station's output cell.
    fn generate(&mut self, _ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        Err(Error::Scheduling(format!(
            "{} cannot carry out '{}'",
            self.name(),
            command
        )))
    }

    /// Takes the atom waiting on the station's input cell.
    fn consume(&mut self, _ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        Err(Error::Scheduling(format!(
            "{} cannot carry out '{}'",
            self.name(),
            command
        )))
    }

    /// Carries the atom on the input cell to the output cell unchanged.
    fn pass_through(&mut self, ctx: &mut SynthesisContext<'_>) -> Result<(), Error> {
        self.carrier_mut().pass_through(ctx)
    }
}

#[derive(Debug, Clone)]
pub enum Station {
    Feeder(Feeder),
    Buffer(BufferStation),
    Salt(SaltStation),
    VanBerlo(VanBerloStation),
    Projection(ProjectionStation),
    Purification(PurificationStation),
    Quintessence(QuintessenceStation),
    SingleOutput(SingleOutput),
    Assembler(RowAssembler),
}

impl Station {
    pub fn as_station(&self) -> &dyn AtomStation {
        match self {
            Station::Feeder(s) => s,
            Station::Buffer(s) => s,
            Station::Salt(s) => s,
            Station::VanBerlo(s) => s,
            Station::Projection(s) => s,
            Station::Purification(s) => s,
            Station::Quintessence(s) => s,
            Station::SingleOutput(s) => s,
            Station::Assembler(s) => s,
        }
    }

    fn as_station_mut(&mut self) -> &mut dyn AtomStation {
        match self {
            Station::Feeder(s) => s,
            Station::Buffer(s) => s,
            Station::Salt(s) => s,
            Station::VanBerlo(s) => s,
            Station::Projection(s) => s,
            Station::Purification(s) => s,
            Station::Quintessence(s) => s,
            Station::SingleOutput(s) => s,
            Station::Assembler(s) => s,
        }
    }

    pub fn width(&self) -> i32 {
        self.as_station().carrier().width()
    }
}

/// Which station answers for which generator.
#[derive(Debug, Clone, Default)]
pub struct StationMap {
    generators: HashMap<GeneratorId, usize>,
    products: HashMap<usize, usize>,
    output: Option<GeneratorId>,
    buffer: Option<usize>,
}

impl StationMap {
    pub fn station_for(&self, command: &Command) -> Result<usize, Error> {
        if Some(command.generator) == self.output {
            let group = command.group.ok_or_else(|| {
                Error::Scheduling(format!("'{}' does not name a product", command))
            })?;
            return self.products.get(&group).copied().ok_or_else(|| {
                Error::Scheduling(format!("no output station for product {}", group))
            });
        }
        self.generators
            .get(&command.generator)
            .copied()
            .ok_or_else(|| Error::Scheduling(format!("no station for {}", command.generator)))
    }

    pub fn buffer(&self) -> Option<usize> {
        self.buffer
    }
}

/// Every station of a solution, in conveyor order.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    stations: Vec<Station>,
    map: StationMap,
    next_origin: HexPos,
}

impl Layout {
    /// Creates one station per pipeline stage, and the output stations.
    ///
    /// Reagents get one feeder each. Products are served by a single
    /// output carrier when they are all single atoms and few enough,
    /// otherwise by one row assembler per product.
    ///
    /// # Errors
    ///
    /// Fails when a station needs a part the puzzle withholds, or when a
    /// molecule cannot be taken apart or assembled on the lattice.
    pub fn build(ctx: &mut SynthesisContext<'_>, pipeline: &Pipeline) -> Result<Self, Error> {
        let puzzle = ctx.puzzle;
        let mut layout = Layout::default();
        for stage in pipeline.stages() {
            match &stage.node {
                ElementNode::Input(input) => {
                    for (generator, molecule) in input.reagents().iter().zip(&puzzle.reagents) {
                        let index = generator.id().0;
                        let origin = layout.next_origin;
                        let feeder = Feeder::new(ctx, origin, index, molecule)?;
                        if feeder.steps_per_round() != molecule.atom_count() {
                            return Err(Error::Scheduling(format!(
                                "reagent {} feeder releases {} of {} atoms",
                                index,
                                feeder.steps_per_round(),
                                molecule.atom_count()
                            )));
                        }
                        layout.push(Station::Feeder(feeder), Some(generator.id()));
                    }
                }
                ElementNode::Buffer(node) => {
                    let station =
                        BufferStation::new(ctx, layout.next_origin, node.peak().max(1))?;
                    layout.map.buffer = Some(layout.stations.len());
                    layout.push(Station::Buffer(station), Some(node.id()));
                }
                ElementNode::Salt(node) => {
                    let station = SaltStation::new(ctx, layout.next_origin)?;
                    layout.push(Station::Salt(station), Some(node.id()));
                }
                ElementNode::VanBerlo(node) => {
                    let station = VanBerloStation::new(ctx, layout.next_origin)?;
                    layout.push(Station::VanBerlo(station), Some(node.id()));
                }
                ElementNode::Metal(node) => {
                    let station = match node.method() {
                        MetalMethod::Projection { .. } => {
                            Station::Projection(ProjectionStation::new(ctx, layout.next_origin)?)
                        }
                        MetalMethod::Purification { .. } => Station::Purification(
                            PurificationStation::new(ctx, layout.next_origin)?,
                        ),
                    };
                    layout.push(station, Some(node.id()));
                }
                ElementNode::Quintessence(node) => {
                    let station = QuintessenceStation::new(ctx, layout.next_origin)?;
                    layout.push(Station::Quintessence(station), Some(node.id()));
                }
            }
        }

        let output = pipeline.output();
        layout.map.output = Some(output.id());
        let plans = output.products();
        let singles = puzzle.products.iter().all(|m| m.atom_count() == 1);
        if singles && plans.len() <= ctx.config.single_output_limit {
            let station = SingleOutput::new(ctx, layout.next_origin, plans)?;
            let index = layout.stations.len();
            for plan in plans {
                layout.map.products.insert(plan.index, index);
            }
            layout.push(Station::SingleOutput(station), None);
        } else {
            for plan in plans {
                let molecule = puzzle.products.get(plan.index).ok_or_else(|| {
                    Error::Scheduling(format!("no product {} to assemble", plan.index))
                })?;
                let station = RowAssembler::new(ctx, layout.next_origin, plan, molecule)?;
                layout.map.products.insert(plan.index, layout.stations.len());
                layout.push(Station::Assembler(station), None);
            }
        }

        for (i, station) in layout.stations.iter().enumerate() {
            debug!(
                "station {}: {} ({} wide)",
                i,
                station.as_station().name(),
                station.width()
            );
        }
        Ok(layout)
    }

    fn push(&mut self, station: Station, generator: Option<GeneratorId>) {
        if let Some(generator) = generator {
            self.map.generators.insert(generator, self.stations.len());
        }
        self.next_origin += HexPos::new(station.width(), 0);
        self.stations.push(station);
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn map(&self) -> &StationMap {
        &self.map
    }

    /// Turns the command sequence into carrier motion.
    ///
    /// Every atom trip starts a new writer fragment: a Generate, or a
    /// Consume whose atom comes out of the buffer. Between its source and
    /// its destination the atom passes through every station on the way.
    pub fn replay(
        &mut self,
        ctx: &mut SynthesisContext<'_>,
        commands: &CommandSequence,
    ) -> Result<(), Error> {
        let mut carried: Option<usize> = None;
        for command in commands.commands() {
            let target = self.map.station_for(command)?;
            trace!("replaying '{}' at station {}", command, target);
            match command.kind {
                CommandKind::Generate => {
                    if carried.is_some() {
                        return Err(Error::Scheduling(format!(
                            "'{}' while another atom is still on the conveyor",
                            command
                        )));
                    }
                    ctx.writer.new_fragment()?;
                    self.stations[target].as_station_mut().generate(ctx, command)?;
                    carried = Some(target);
                }
                CommandKind::PrepareToGenerate => {
                    let from = carried.take().ok_or_else(|| {
                        Error::Scheduling(format!("'{}' with no atom to park", command))
                    })?;
                    self.convey(ctx, from, target)?;
                    self.stations[target].as_station_mut().consume(ctx, command)?;
                }
                CommandKind::Consume => {
                    let from = match carried.take() {
                        Some(from) => from,
                        None if Some(target) == self.map.buffer => {
                            if let Station::Buffer(buffer) = &mut self.stations[target] {
                                buffer.discard(command.element)?;
                            }
                            continue;
                        }
                        None => {
                            let buffer = self.map.buffer.ok_or_else(|| {
                                Error::Scheduling(format!(
                                    "'{}' with no atom and no buffer to draw from",
                                    command
                                ))
                            })?;
                            ctx.writer.new_fragment()?;
                            self.stations[buffer].as_station_mut().generate(ctx, command)?;
                            buffer
                        }
                    };
                    self.convey(ctx, from, target)?;
                    self.stations[target].as_station_mut().consume(ctx, command)?;
                }
            }
        }
        if let Some(station) = carried {
            return Err(Error::Scheduling(format!(
                "an atom was left on the output of station {}",
                station
            )));
        }
        Ok(())
    }

    fn convey(&mut self, ctx: &mut SynthesisContext<'_>, from: usize, to: usize) -> Result<(), Error> {
        if to <= from {
            return Err(Error::Scheduling(format!(
                "station {} cannot send an atom back to station {}",
                from, to
            )));
        }
        for station in &mut self.stations[from + 1..to] {
            station.as_station_mut().pass_through(ctx)?;
        }
        Ok(())
    }

    /// Track nodes with the furthest position their carrier reached.
    pub fn track_reach(&self) -> Vec<(NodeId, i32)> {
        self.stations
            .iter()
            .filter_map(|s| {
                let carrier = s.as_station().carrier();
                carrier.track().map(|t| (t, carrier.reach()))
            })
            .collect()
    }
}
