//! Buffer and transmuter stations.
//!
//! Each station is a carrier plus whatever glyphs its transformation
//! needs, laid out in rows one and two above the conveyor. Inputs are
//! delivered onto the glyph cells and results fetched back down to the
//! station's output cell.

use super::carrier::{Carrier, deliver, fetch};
use super::{AtomStation, SynthesisContext};
use crate::model::hex::{HexPos, Pose, Rotation};
use crate::model::program::Instruction;
use crate::model::tree::{ArmId, NodeId, NodeKind};
use crate::model::types::{Element, GlyphKind, MechanismKind};
use crate::solver::commands::Command;
use crate::solver::elements::WHEEL_ELEMENTS;
use crate::solver::error::Error;
use crate::solver::writer::ArmPose;

fn unexpected(station: &str, command: &Command, detail: &str) -> Error {
    Error::Scheduling(format!("{}: '{}' {}", station, command, detail))
}

/// Parks atoms in row one until a consumer asks for them.
#[derive(Debug, Clone)]
pub struct BufferStation {
    carrier: Carrier,
    slots: Vec<Option<Element>>,
}

impl BufferStation {
    pub fn new(ctx: &mut SynthesisContext<'_>, origin: HexPos, capacity: usize) -> Result<Self, Error> {
        let frame = ctx.add_frame(origin);
        let width = capacity as i32 + 1;
        let carrier = Carrier::install(ctx, frame, origin, width)?;
        Ok(Self {
            carrier,
            slots: vec![None; capacity],
        })
    }

    pub fn held(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Forgets a parked atom without moving it.
    pub fn discard(&mut self, element: Element) -> Result<(), Error> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| **s == Some(element))
            .ok_or_else(|| Error::Scheduling(format!("buffer holds no {} to discard", element)))?;
        *slot = None;
        Ok(())
    }
}

impl AtomStation for BufferStation {
    fn name(&self) -> String {
        format!("buffer ({} slots)", self.slots.len())
    }

    fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    fn carrier_mut(&mut self) -> &mut Carrier {
        &mut self.carrier
    }

    fn generate(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        let index = self
            .slots
            .iter()
            .position(|s| *s == Some(command.element))
            .ok_or_else(|| unexpected("buffer", command, "but nothing of that kind is parked"))?;
        self.slots[index] = None;
        let x = index as i32 + 1;
        self.carrier.run(ctx, &fetch(x, 1, self.carrier.width()))?;
        self.carrier.hand_off(ctx);
        Ok(())
    }

    fn consume(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| unexpected("buffer", command, "but every slot is taken"))?;
        self.slots[index] = Some(command.element);
        self.carrier.run(ctx, &deliver(index as i32 + 1, 1))?;
        Ok(())
    }
}

/// Calcification on `(1, 1)`.
#[derive(Debug, Clone)]
pub struct SaltStation {
    carrier: Carrier,
    glyph: NodeId,
    loaded: bool,
}

impl SaltStation {
    pub fn new(ctx: &mut SynthesisContext<'_>, origin: HexPos) -> Result<Self, Error> {
        let frame = ctx.add_frame(origin);
        let carrier = Carrier::install(ctx, frame, origin, 2)?;
        let glyph = ctx.add_glyph(frame, Pose::at(HexPos::new(1, 1)), GlyphKind::Calcification)?;
        Ok(Self {
            carrier,
            glyph,
            loaded: false,
        })
    }
}

impl AtomStation for SaltStation {
    fn name(&self) -> String {
        "salt".to_string()
    }

    fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    fn carrier_mut(&mut self) -> &mut Carrier {
        &mut self.carrier
    }

    fn generate(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        if command.element != Element::Salt || !self.loaded {
            return Err(unexpected("salt", command, "without a calcified cardinal"));
        }
        self.loaded = false;
        self.carrier.run(ctx, &fetch(1, 1, 2))?;
        self.carrier.hand_off(ctx);
        Ok(())
    }

    fn consume(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        if !command.element.is_cardinal() || self.loaded {
            return Err(unexpected("salt", command, "cannot be calcified now"));
        }
        self.carrier.run(ctx, &deliver(1, 1))?;
        ctx.mark_used(self.glyph);
        self.loaded = true;
        Ok(())
    }
}

/// Duplication glyph fed by a Van Berlo's wheel above it.
///
/// The target cardinal is only known when the station is asked to
/// generate, so consuming salt just grabs it and points it up; the drop
/// onto the glyph happens once the wheel has turned.
#[derive(Debug, Clone)]
pub struct VanBerloStation {
    carrier: Carrier,
    glyph: NodeId,
    wheel: ArmId,
    wheel_pose: ArmPose,
    holding: bool,
}

/// Wheel direction that faces the duplication glyph.
const WHEEL_FACING: i32 = 4;

impl VanBerloStation {
    pub fn new(ctx: &mut SynthesisContext<'_>, origin: HexPos) -> Result<Self, Error> {
        ctx.require_mechanism(MechanismKind::VanBerlo, "cardinals are duplicated from its wheel")?;
        let frame = ctx.add_frame(origin);
        let carrier = Carrier::install(ctx, frame, origin, 3)?;
        let glyph = ctx.add_glyph(
            frame,
            Pose::new(HexPos::new(2, 1), Rotation::HALF_TURN),
            GlyphKind::Duplication,
        )?;
        let wheel = ctx.next_arm();
        ctx.tree.add(
            Some(frame),
            Pose::at(HexPos::new(2, 2)),
            NodeKind::Arm {
                kind: MechanismKind::VanBerlo,
                extension: 1,
                id: wheel,
            },
        );
        Ok(Self {
            carrier,
            glyph,
            wheel,
            wheel_pose: ArmPose::default(),
            holding: false,
        })
    }

    pub fn wheel(&self) -> ArmId {
        self.wheel
    }

    /// Signed counterclockwise turn that brings `element` over the glyph.
    fn turn_for(element: Element) -> Option<i32> {
        if !element.is_cardinal() {
            return None;
        }
        let index = WHEEL_ELEMENTS.iter().position(|&e| e == element)?;
        Some(Rotation::new(WHEEL_FACING - index as i32).signed())
    }
}

impl AtomStation for VanBerloStation {
    fn name(&self) -> String {
        "van berlo".to_string()
    }

    fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    fn carrier_mut(&mut self) -> &mut Carrier {
        &mut self.carrier
    }

    fn generate(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        if !self.holding {
            return Err(unexpected("van berlo", command, "without salt in hand"));
        }
        let turn = Self::turn_for(command.element)
            .ok_or_else(|| unexpected("van berlo", command, "is not on the wheel"))?;
        let instruction = if turn >= 0 {
            Instruction::RotateCounterclockwise
        } else {
            Instruction::RotateClockwise
        };
        for _ in 0..turn.abs() {
            ctx.writer.write(self.wheel, instruction);
            self.wheel_pose.apply(instruction);
        }
        self.carrier
            .run(ctx, &[Instruction::Extend, Instruction::Drop])?;
        ctx.mark_used(self.glyph);
        if self.wheel_pose.is_rest() {
            self.carrier.run(ctx, &[Instruction::Reset])?;
        } else {
            self.carrier.reset_with(ctx, self.wheel, &mut self.wheel_pose);
        }
        self.holding = false;

        self.carrier.run(ctx, &fetch(1, 1, 3))?;
        self.carrier.hand_off(ctx);
        Ok(())
    }

    fn consume(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        if command.element != Element::Salt || self.holding {
            return Err(unexpected("van berlo", command, "cannot be taken now"));
        }
        self.carrier
            .run(ctx, &[Instruction::Grab, Instruction::RotateClockwise])?;
        self.holding = true;
        Ok(())
    }
}

/// Projection glyph: quicksilver on `(2, 1)`, metal on `(1, 1)`.
#[derive(Debug, Clone)]
pub struct ProjectionStation {
    carrier: Carrier,
    glyph: NodeId,
    metal: Option<Element>,
}

impl ProjectionStation {
    pub fn new(ctx: &mut SynthesisContext<'_>, origin: HexPos) -> Result<Self, Error> {
        let frame = ctx.add_frame(origin);
        let carrier = Carrier::install(ctx, frame, origin, 2)?;
        let glyph = ctx.add_glyph(
            frame,
            Pose::new(HexPos::new(2, 1), Rotation::HALF_TURN),
            GlyphKind::Projection,
        )?;
        Ok(Self {
            carrier,
            glyph,
            metal: None,
        })
    }
}

impl AtomStation for ProjectionStation {
    fn name(&self) -> String {
        "projection".to_string()
    }

    fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    fn carrier_mut(&mut self) -> &mut Carrier {
        &mut self.carrier
    }

    fn generate(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        if self.metal != Some(command.element) {
            return Err(unexpected("projection", command, "does not match the metal on the glyph"));
        }
        self.metal = None;
        self.carrier.run(ctx, &fetch(1, 1, 2))?;
        self.carrier.hand_off(ctx);
        Ok(())
    }

    fn consume(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        match (command.element, self.metal) {
            (Element::Quicksilver, Some(metal)) => {
                let raised = metal
                    .metal_rank()
                    .and_then(|rank| Element::metal_of_rank(rank + 1))
                    .ok_or_else(|| unexpected("projection", command, "has nothing left to raise"))?;
                self.carrier.run(ctx, &deliver(2, 1))?;
                self.carrier.vacate([HexPos::new(2, 1)]);
                ctx.mark_used(self.glyph);
                self.metal = Some(raised);
            }
            (element, None) if element.is_metal() => {
                self.carrier.run(ctx, &deliver(1, 1))?;
                self.metal = Some(element);
            }
            _ => return Err(unexpected("projection", command, "cannot be placed")),
        }
        Ok(())
    }
}

/// Purification glyph: inputs on `(1, 1)` and `(2, 1)`, result on `(1, 2)`.
#[derive(Debug, Clone)]
pub struct PurificationStation {
    carrier: Carrier,
    glyph: NodeId,
    inputs: usize,
}

impl PurificationStation {
    pub fn new(ctx: &mut SynthesisContext<'_>, origin: HexPos) -> Result<Self, Error> {
        let frame = ctx.add_frame(origin);
        let carrier = Carrier::install(ctx, frame, origin, 2)?;
        let glyph = ctx.add_glyph(frame, Pose::at(HexPos::new(1, 1)), GlyphKind::Purification)?;
        Ok(Self {
            carrier,
            glyph,
            inputs: 0,
        })
    }
}

impl AtomStation for PurificationStation {
    fn name(&self) -> String {
        "purification".to_string()
    }

    fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    fn carrier_mut(&mut self) -> &mut Carrier {
        &mut self.carrier
    }

    fn generate(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        if self.inputs != 2 || !command.element.is_metal() {
            return Err(unexpected("purification", command, "before both inputs arrived"));
        }
        self.inputs = 0;
        self.carrier.run(ctx, &fetch(1, 2, 2))?;
        self.carrier.hand_off(ctx);
        Ok(())
    }

    fn consume(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        if self.inputs >= 2 || !command.element.is_metal() {
            return Err(unexpected("purification", command, "cannot be placed"));
        }
        self.inputs += 1;
        self.carrier.run(ctx, &deliver(self.inputs as i32, 1))?;
        if self.inputs == 2 {
            self.carrier.vacate([HexPos::new(1, 1), HexPos::new(2, 1)]);
            self.carrier.settle([HexPos::new(1, 2)]);
            ctx.mark_used(self.glyph);
        }
        Ok(())
    }
}

/// Unification glyph centered on `(2, 1)`.
#[derive(Debug, Clone)]
pub struct QuintessenceStation {
    carrier: Carrier,
    glyph: NodeId,
    inputs: usize,
}

/// Glyph cells filled in delivery order. Row zero is filled last because
/// deliveries further right travel along it.
const UNIFICATION_SLOTS: [(i32, i32); 4] = [(1, 2), (3, 1), (1, 1), (3, 0)];

impl QuintessenceStation {
    pub fn new(ctx: &mut SynthesisContext<'_>, origin: HexPos) -> Result<Self, Error> {
        let frame = ctx.add_frame(origin);
        let carrier = Carrier::install(ctx, frame, origin, 4)?;
        let glyph = ctx.add_glyph(
            frame,
            Pose::new(HexPos::new(2, 1), Rotation::COUNTERCLOCKWISE),
            GlyphKind::Unification,
        )?;
        Ok(Self {
            carrier,
            glyph,
            inputs: 0,
        })
    }
}

impl AtomStation for QuintessenceStation {
    fn name(&self) -> String {
        "quintessence".to_string()
    }

    fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    fn carrier_mut(&mut self) -> &mut Carrier {
        &mut self.carrier
    }

    fn generate(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        if self.inputs != UNIFICATION_SLOTS.len() || command.element != Element::Quintessence {
            return Err(unexpected("quintessence", command, "before all four cardinals arrived"));
        }
        self.inputs = 0;
        self.carrier.run(ctx, &fetch(2, 1, 4))?;
        self.carrier.hand_off(ctx);
        Ok(())
    }

    fn consume(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        let Some(&(x, row)) = UNIFICATION_SLOTS.get(self.inputs) else {
            return Err(unexpected("quintessence", command, "but the glyph is full"));
        };
        if !command.element.is_cardinal() {
            return Err(unexpected("quintessence", command, "is not a cardinal"));
        }
        self.inputs += 1;
        self.carrier.run(ctx, &deliver(x, row))?;
        if self.inputs == UNIFICATION_SLOTS.len() {
            self.carrier
                .vacate(UNIFICATION_SLOTS.iter().map(|&(q, r)| HexPos::new(q, r)));
            self.carrier.settle([HexPos::new(2, 1)]);
            ctx.mark_used(self.glyph);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::molecule::Molecule;
    use crate::model::puzzle::Puzzle;
    use crate::solver::commands::{CommandKind, GeneratorId};
    use crate::solver::config::SolverConfig;

    fn puzzle() -> Puzzle {
        let fire = Molecule::from_elements(&[(Element::Fire, HexPos::ORIGIN)]).unwrap();
        Puzzle::new("stations", vec![fire.clone()], vec![fire])
    }

    fn command(kind: CommandKind, element: Element) -> Command {
        Command {
            kind,
            element,
            generator: GeneratorId(1),
            group: None,
        }
    }

    fn glyph_cells(ctx: &SynthesisContext<'_>, kind: GlyphKind) -> Vec<HexPos> {
        let (id, _) = ctx
            .tree
            .iter()
            .find(|(_, n)| n.kind == NodeKind::Glyph { kind })
            .unwrap();
        let pose = ctx.tree.world_pose(id).unwrap();
        let mut cells: Vec<HexPos> = kind.footprint().iter().map(|&c| pose.apply(c)).collect();
        cells.sort();
        cells
    }

    #[test]
    fn buffer_fills_lowest_free_slot() {
        let p = puzzle();
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&p, &config);
        let mut buffer = BufferStation::new(&mut ctx, HexPos::ORIGIN, 2).unwrap();
        assert_eq!(buffer.carrier().width(), 3);

        let park = |e| command(CommandKind::PrepareToGenerate, e);
        buffer.consume(&mut ctx, &park(Element::Fire)).unwrap();
        buffer.consume(&mut ctx, &park(Element::Water)).unwrap();
        assert_eq!(buffer.held(), 2);
        assert!(buffer.consume(&mut ctx, &park(Element::Air)).is_err());

        buffer
            .generate(&mut ctx, &command(CommandKind::Consume, Element::Fire))
            .unwrap();
        buffer.consume(&mut ctx, &park(Element::Air)).unwrap();
        assert_eq!(buffer.slots, vec![Some(Element::Air), Some(Element::Water)]);

        buffer.discard(Element::Water).unwrap();
        assert!(buffer.discard(Element::Water).is_err());
        assert_eq!(buffer.held(), 1);
    }

    #[test]
    fn salt_glyph_is_used_once_loaded() {
        let p = puzzle();
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&p, &config);
        let mut salt = SaltStation::new(&mut ctx, HexPos::new(5, 0)).unwrap();
        assert!(
            salt.generate(&mut ctx, &command(CommandKind::Generate, Element::Salt))
                .is_err()
        );
        assert!(ctx.used_glyphs().is_empty());

        salt.consume(&mut ctx, &command(CommandKind::Consume, Element::Fire))
            .unwrap();
        assert_eq!(ctx.used_glyphs().len(), 1);
        assert_eq!(glyph_cells(&ctx, GlyphKind::Calcification), vec![HexPos::new(6, 1)]);
        salt.generate(&mut ctx, &command(CommandKind::Generate, Element::Salt))
            .unwrap();
    }

    #[test]
    fn wheel_turns_toward_each_cardinal() {
        assert_eq!(VanBerloStation::turn_for(Element::Fire), Some(0));
        assert_eq!(VanBerloStation::turn_for(Element::Air), Some(2));
        assert_eq!(VanBerloStation::turn_for(Element::Water), Some(3));
        assert_eq!(VanBerloStation::turn_for(Element::Earth), Some(-1));
        assert_eq!(VanBerloStation::turn_for(Element::Salt), None);
    }

    #[test]
    fn van_berlo_needs_salt_in_hand() {
        let p = puzzle();
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&p, &config);
        let mut station = VanBerloStation::new(&mut ctx, HexPos::ORIGIN).unwrap();
        assert_eq!(station.carrier().arm(), ArmId(0));
        assert_eq!(station.wheel(), ArmId(1));
        let generate = command(CommandKind::Generate, Element::Water);
        assert!(station.generate(&mut ctx, &generate).is_err());

        station
            .consume(&mut ctx, &command(CommandKind::Consume, Element::Salt))
            .unwrap();
        station.generate(&mut ctx, &generate).unwrap();
        assert!(station.wheel_pose.is_rest());
        let duplication = glyph_cells(&ctx, GlyphKind::Duplication);
        assert_eq!(duplication, vec![HexPos::new(1, 1), HexPos::new(2, 1)]);
    }

    #[test]
    fn van_berlo_requires_the_mechanism() {
        let mut p = puzzle();
        p.allowed_mechanisms.remove(&MechanismKind::VanBerlo);
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&p, &config);
        let err = VanBerloStation::new(&mut ctx, HexPos::ORIGIN).unwrap_err();
        assert!(err.is_capability());
    }

    #[test]
    fn projection_raises_one_rank_per_quicksilver() {
        let p = puzzle();
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&p, &config);
        let mut station = ProjectionStation::new(&mut ctx, HexPos::ORIGIN).unwrap();
        assert_eq!(
            glyph_cells(&ctx, GlyphKind::Projection),
            vec![HexPos::new(1, 1), HexPos::new(2, 1)]
        );
        let consume = |e| command(CommandKind::Consume, e);
        station.consume(&mut ctx, &consume(Element::Lead)).unwrap();
        station.consume(&mut ctx, &consume(Element::Quicksilver)).unwrap();
        station.consume(&mut ctx, &consume(Element::Quicksilver)).unwrap();
        assert!(
            station
                .generate(&mut ctx, &command(CommandKind::Generate, Element::Tin))
                .is_err()
        );
        station
            .generate(&mut ctx, &command(CommandKind::Generate, Element::Iron))
            .unwrap();
    }

    #[test]
    fn purification_takes_two_inputs() {
        let p = puzzle();
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&p, &config);
        let mut station = PurificationStation::new(&mut ctx, HexPos::ORIGIN).unwrap();
        let consume = command(CommandKind::Consume, Element::Lead);
        station.consume(&mut ctx, &consume).unwrap();
        assert!(ctx.used_glyphs().is_empty());
        station.consume(&mut ctx, &consume).unwrap();
        assert!(station.consume(&mut ctx, &consume).is_err());
        assert_eq!(ctx.used_glyphs().len(), 1);
        station
            .generate(&mut ctx, &command(CommandKind::Generate, Element::Tin))
            .unwrap();
    }

    #[test]
    fn unification_slots_lie_on_the_glyph() {
        let p = puzzle();
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&p, &config);
        let mut station = QuintessenceStation::new(&mut ctx, HexPos::ORIGIN).unwrap();
        let cells = glyph_cells(&ctx, GlyphKind::Unification);
        for (x, row) in UNIFICATION_SLOTS {
            assert!(cells.contains(&HexPos::new(x, row)));
        }
        assert!(cells.contains(&HexPos::new(2, 1)));

        for element in Element::CARDINALS {
            station
                .consume(&mut ctx, &command(CommandKind::Consume, element))
                .unwrap();
        }
        assert!(
            station
                .consume(&mut ctx, &command(CommandKind::Consume, Element::Fire))
                .is_err()
        );
        station
            .generate(&mut ctx, &command(CommandKind::Generate, Element::Quintessence))
            .unwrap();
    }
}
