//! Demand-driven chemistry resolution.
//!
//! The pipeline is a linear chain of element generators. The terminal
//! [`OutputNode`] pulls every product atom from the chain; each request
//! walks upstream until some node can satisfy it, recording the
//! [`Command`](super::commands::Command)s that entailed.
//!
//! A node resolves a request in one of four ways:
//!
//! - **passing through** when its parent can already supply a candidate,
//! - **transmuting** by consuming upstream atoms and generating a new one,
//! - **generating** from a reagent it owns,
//! - **buffering** atoms drawn ahead of need and handing them out later.

mod buffer;
mod metal;
mod output;
mod reagent;
mod salt;
mod unification;
mod vanberlo;

use std::fmt;
use std::ops::{BitAnd, BitOr, Sub};

use log::{debug, info};

pub use buffer::BufferNode;
pub use metal::{MetalMethod, MetalNode};
pub use output::{OutputNode, ProductPlan};
pub use reagent::{InputNode, input_order};
pub use salt::SaltNode;
pub use unification::QuintessenceNode;
pub use vanberlo::{VanBerloNode, WHEEL_ELEMENTS};

use super::commands::{CommandSequence, GeneratorId};
use super::config::{MetalStrategy, SolverConfig};
use super::error::Error;
use crate::model::puzzle::Puzzle;
use crate::model::types::{Element, GlyphKind, MechanismKind};

/// A small set of elements.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ElementSet(u32);

impl ElementSet {
    pub const EMPTY: ElementSet = ElementSet(0);

    pub fn single(element: Element) -> Self {
        ElementSet(1 << element.code())
    }

    pub fn of(elements: &[Element]) -> Self {
        elements.iter().copied().collect()
    }

    pub fn cardinals() -> Self {
        Self::of(&Element::CARDINALS)
    }

    pub fn metals() -> Self {
        Self::of(&Element::METALS)
    }

    pub fn contains(self, element: Element) -> bool {
        self.0 & (1 << element.code()) != 0
    }

    pub fn insert(&mut self, element: Element) {
        self.0 |= 1 << element.code();
    }

    pub fn remove(&mut self, element: Element) {
        self.0 &= !(1 << element.code());
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Element> {
        Element::ALL.into_iter().filter(move |e| self.contains(*e))
    }

    pub fn to_vec(self) -> Vec<Element> {
        self.iter().collect()
    }
}

impl FromIterator<Element> for ElementSet {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        let mut set = ElementSet::EMPTY;
        for e in iter {
            set.insert(e);
        }
        set
    }
}

impl BitAnd for ElementSet {
    type Output = ElementSet;
    fn bitand(self, rhs: Self) -> Self {
        ElementSet(self.0 & rhs.0)
    }
}

impl BitOr for ElementSet {
    type Output = ElementSet;
    fn bitor(self, rhs: Self) -> Self {
        ElementSet(self.0 | rhs.0)
    }
}

impl Sub for ElementSet {
    type Output = ElementSet;
    fn sub(self, rhs: Self) -> Self {
        ElementSet(self.0 & !rhs.0)
    }
}

impl fmt::Debug for ElementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// The "element source" capability shared by every pipeline node.
pub trait ElementSource {
    /// Elements this node adds on top of what flows through it.
    fn produces(&self) -> ElementSet;

    /// Produces one of `candidates` that nothing upstream offers.
    fn transmute(
        &mut self,
        candidates: ElementSet,
        upstream: &mut Upstream<'_>,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error>;

    /// Produces exactly one atom of one of `candidates`.
    ///
    /// Requests the parent can satisfy pass through untouched.
    fn request(
        &mut self,
        candidates: ElementSet,
        upstream: &mut Upstream<'_>,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        let available = candidates & upstream.outputs();
        if !available.is_empty() {
            return upstream.request(available, seq);
        }
        self.transmute(candidates, upstream, seq)
    }
}

#[derive(Debug, Clone)]
pub enum ElementNode {
    Input(InputNode),
    Buffer(BufferNode),
    Salt(SaltNode),
    VanBerlo(VanBerloNode),
    Metal(MetalNode),
    Quintessence(QuintessenceNode),
}

impl ElementNode {
    pub fn name(&self) -> String {
        match self {
            ElementNode::Input(n) => format!("input ({} reagent(s))", n.reagents().len()),
            ElementNode::Buffer(_) => "element buffer".to_string(),
            ElementNode::Salt(_) => "salt (calcification)".to_string(),
            ElementNode::VanBerlo(_) => "van berlo wheel".to_string(),
            ElementNode::Metal(n) => n.describe(),
            ElementNode::Quintessence(_) => "quintessence (unification)".to_string(),
        }
    }

    fn as_source(&mut self) -> &mut dyn ElementSource {
        match self {
            ElementNode::Input(n) => n,
            ElementNode::Buffer(n) => n,
            ElementNode::Salt(n) => n,
            ElementNode::VanBerlo(n) => n,
            ElementNode::Metal(n) => n,
            ElementNode::Quintessence(n) => n,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stage {
    pub node: ElementNode,
    /// Everything this stage can hand downstream.
    pub outputs: ElementSet,
}

/// View of the stages above a node, nearest parent last.
pub struct Upstream<'a> {
    stages: &'a mut [Stage],
}

impl<'a> Upstream<'a> {
    pub fn new(stages: &'a mut [Stage]) -> Self {
        Self { stages }
    }

    pub fn outputs(&self) -> ElementSet {
        self.stages
            .last()
            .map(|s| s.outputs)
            .unwrap_or(ElementSet::EMPTY)
    }

    pub fn request(
        &mut self,
        candidates: ElementSet,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        let Some((parent, rest)) = self.stages.split_last_mut() else {
            return Err(Error::resolution(&candidates.to_vec(), "no upstream stage"));
        };
        let acceptable = candidates & parent.outputs;
        if acceptable.is_empty() {
            return Err(Error::resolution(
                &candidates.to_vec(),
                format!("not produced upstream of {}", parent.node.name()),
            ));
        }
        let mut above = Upstream { stages: rest };
        parent.node.as_source().request(acceptable, &mut above, seq)
    }

    /// The reagent aggregate, when it is the immediate parent.
    pub fn input_mut(&mut self) -> Option<&mut InputNode> {
        match self.stages.last_mut() {
            Some(Stage {
                node: ElementNode::Input(input),
                ..
            }) => Some(input),
            _ => None,
        }
    }
}

/// The full chain from reagents to products.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
    output: OutputNode,
}

impl Pipeline {
    /// Builds the chain by working backwards from what the products need.
    ///
    /// Fails with a capability error when a required stage uses a glyph or
    /// mechanism the puzzle withholds, and with a resolution error when no
    /// stage could ever produce a needed element.
    pub fn build(puzzle: &Puzzle, repeating: &[bool], config: &SolverConfig) -> Result<Self, Error> {
        let input = InputNode::new(&puzzle.reagents);
        let available: ElementSet = puzzle.reagent_elements().into_iter().collect();
        let needed: ElementSet = puzzle.product_elements().into_iter().collect();

        let mut missing = needed - available;
        let need_quintessence = missing.contains(Element::Quintessence);
        if need_quintessence {
            missing = missing | (ElementSet::cardinals() - available);
        }

        let metal_targets = missing & ElementSet::metals();
        let metal_strategy = if metal_targets.is_empty() {
            None
        } else {
            Some(choose_metal_strategy(puzzle, available, config)?)
        };
        if metal_strategy == Some(MetalStrategy::Projection)
            && !available.contains(Element::Quicksilver)
        {
            return Err(Error::resolution(
                &[Element::Quicksilver],
                "projection needs a reagent that supplies quicksilver",
            ));
        }

        let need_van_berlo = !(missing & ElementSet::cardinals()).is_empty();
        let need_salt = missing.contains(Element::Salt)
            || (need_van_berlo && !available.contains(Element::Salt));
        if need_salt && (available & ElementSet::cardinals()).is_empty() {
            return Err(Error::resolution(
                &[Element::Salt],
                "calcification needs a reagent that supplies a cardinal element",
            ));
        }

        let producible = ElementSet::cardinals()
            | ElementSet::metals()
            | ElementSet::of(&[Element::Salt, Element::Quintessence]);
        let impossible = missing - producible;
        if !impossible.is_empty() {
            return Err(Error::resolution(
                &impossible.to_vec(),
                "no reagent supplies it and no stage can produce it",
            ));
        }

        let mut next_id = puzzle.reagents.len();
        let mut allocate = || {
            let id = GeneratorId(next_id);
            next_id += 1;
            id
        };

        let mut nodes = vec![ElementNode::Input(input)];
        if puzzle.reagents.iter().any(|r| r.atom_count() > 1) {
            nodes.push(ElementNode::Buffer(BufferNode::new(allocate())));
        }
        if need_salt {
            require_glyph(puzzle, GlyphKind::Calcification, "salt stage")?;
            nodes.push(ElementNode::Salt(SaltNode::new(allocate())));
        }
        if need_van_berlo {
            require_glyph(puzzle, GlyphKind::Duplication, "van berlo stage")?;
            if !puzzle.allows_mechanism(MechanismKind::VanBerlo) {
                return Err(Error::missing_mechanism(
                    MechanismKind::VanBerlo,
                    "cardinal elements must be produced from salt",
                ));
            }
            nodes.push(ElementNode::VanBerlo(VanBerloNode::new(allocate())));
        }
        match metal_strategy {
            Some(MetalStrategy::Purification) => {
                let (base, top) = metal_span(available, metal_targets)?;
                for rank in base + 1..=top {
                    nodes.push(ElementNode::Metal(MetalNode::purification(allocate(), rank)?));
                }
            }
            Some(_) => {
                let (base, _) = metal_span(available, metal_targets)?;
                nodes.push(ElementNode::Metal(MetalNode::projection(allocate(), base)));
            }
            None => {}
        }
        if need_quintessence {
            require_glyph(puzzle, GlyphKind::Unification, "quintessence stage")?;
            nodes.push(ElementNode::Quintessence(QuintessenceNode::new(allocate())));
        }

        let output = OutputNode::new(allocate(), &puzzle.products, repeating, config.replication);

        let mut stages: Vec<Stage> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let inherited = stages.last().map(|s| s.outputs).unwrap_or(ElementSet::EMPTY);
            let produces = node_produces(&node);
            stages.push(Stage {
                node,
                outputs: inherited | produces,
            });
        }
        for stage in &stages {
            debug!("pipeline stage: {} -> {:?}", stage.node.name(), stage.outputs);
        }

        Ok(Self { stages, output })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn output(&self) -> &OutputNode {
        &self.output
    }

    /// Pulls every product atom through the chain and flushes the buffer.
    pub fn run(&mut self) -> Result<CommandSequence, Error> {
        let mut seq = CommandSequence::new();
        {
            let mut upstream = Upstream::new(&mut self.stages);
            self.output.run(&mut upstream, &mut seq)?;
        }
        for stage in &mut self.stages {
            if let ElementNode::Buffer(buffer) = &mut stage.node {
                buffer.end_solution(&mut seq);
            }
        }
        info!("resolved {} chemistry command(s)", seq.len());
        Ok(seq)
    }
}

fn node_produces(node: &ElementNode) -> ElementSet {
    match node {
        ElementNode::Input(n) => n.produces(),
        ElementNode::Buffer(n) => n.produces(),
        ElementNode::Salt(n) => n.produces(),
        ElementNode::VanBerlo(n) => n.produces(),
        ElementNode::Metal(n) => n.produces(),
        ElementNode::Quintessence(n) => n.produces(),
    }
}

fn require_glyph(puzzle: &Puzzle, glyph: GlyphKind, stage: &str) -> Result<(), Error> {
    if puzzle.allows_glyph(glyph) {
        Ok(())
    } else {
        Err(Error::missing_glyph(glyph, format!("needed by the {}", stage)))
    }
}

fn choose_metal_strategy(
    puzzle: &Puzzle,
    available: ElementSet,
    config: &SolverConfig,
) -> Result<MetalStrategy, Error> {
    match config.metal_strategy {
        MetalStrategy::Projection => {
            require_glyph(puzzle, GlyphKind::Projection, "metal stage")?;
            Ok(MetalStrategy::Projection)
        }
        MetalStrategy::Purification => {
            require_glyph(puzzle, GlyphKind::Purification, "metal stage")?;
            Ok(MetalStrategy::Purification)
        }
        MetalStrategy::Auto => {
            if puzzle.allows_glyph(GlyphKind::Projection) && available.contains(Element::Quicksilver)
            {
                Ok(MetalStrategy::Projection)
            } else if puzzle.allows_glyph(GlyphKind::Purification) {
                debug!("projection unavailable, falling back to purification");
                Ok(MetalStrategy::Purification)
            } else {
                Err(Error::missing_glyph(
                    GlyphKind::Projection,
                    "a metal no reagent supplies is required",
                ))
            }
        }
    }
}

/// Ranks of the best supplied base metal and the highest target.
fn metal_span(available: ElementSet, targets: ElementSet) -> Result<(usize, usize), Error> {
    let lowest_target = targets
        .iter()
        .filter_map(|e| e.metal_rank())
        .min()
        .unwrap_or(0);
    let top = targets
        .iter()
        .filter_map(|e| e.metal_rank())
        .max()
        .unwrap_or(0);
    let base = (available & ElementSet::metals())
        .iter()
        .filter_map(|e| e.metal_rank())
        .filter(|&r| r < lowest_target)
        .max()
        .ok_or_else(|| {
            Error::resolution(
                &targets.to_vec(),
                "no reagent supplies a lower metal to refine",
            )
        })?;
    Ok((base, top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::hex::HexPos;
    use crate::model::molecule::Molecule;
    use crate::model::types::BondKind;
    use crate::solver::commands::CommandKind;

    fn single(element: Element) -> Molecule {
        Molecule::from_elements(&[(element, HexPos::ORIGIN)]).unwrap()
    }

    fn pair(a: Element, b: Element) -> Molecule {
        let mut m =
            Molecule::from_elements(&[(a, HexPos::new(0, 0)), (b, HexPos::new(1, 0))]).unwrap();
        m.add_bond(HexPos::new(0, 0), HexPos::new(1, 0), BondKind::Single)
            .unwrap();
        m
    }

    fn solve_commands(puzzle: &Puzzle) -> Result<(Pipeline, CommandSequence), Error> {
        let repeating = vec![false; puzzle.products.len()];
        let mut pipeline = Pipeline::build(puzzle, &repeating, &SolverConfig::default())?;
        let seq = pipeline.run()?;
        Ok((pipeline, seq))
    }

    fn stage_names(pipeline: &Pipeline) -> Vec<String> {
        pipeline.stages().iter().map(|s| s.node.name()).collect()
    }

    #[test]
    fn element_set_operations() {
        let mut set = ElementSet::of(&[Element::Fire, Element::Water]);
        assert!(set.contains(Element::Fire));
        assert_eq!(set.len(), 2);
        set.remove(Element::Fire);
        assert_eq!(set.to_vec(), vec![Element::Water]);
        assert_eq!(
            (ElementSet::cardinals() - ElementSet::single(Element::Air)).len(),
            3
        );
        assert!((ElementSet::metals() & ElementSet::cardinals()).is_empty());
    }

    #[test]
    fn fire_to_fire_is_a_single_trip() {
        let puzzle = Puzzle::new("fire", vec![single(Element::Fire)], vec![single(Element::Fire)]);
        let (pipeline, seq) = solve_commands(&puzzle).unwrap();
        assert_eq!(pipeline.stages().len(), 1);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.commands()[0].kind, CommandKind::Generate);
        assert_eq!(seq.commands()[1].kind, CommandKind::Consume);
        assert!(seq.is_balanced());
    }

    #[test]
    fn salt_stage_transmutes_cardinals() {
        let puzzle = Puzzle::new("salt", vec![single(Element::Air)], vec![single(Element::Salt)]);
        let (pipeline, seq) = solve_commands(&puzzle).unwrap();
        assert_eq!(stage_names(&pipeline)[1], "salt (calcification)");
        let kinds: Vec<_> = seq.commands().iter().map(|c| (c.kind, c.element)).collect();
        assert_eq!(
            kinds,
            vec![
                (CommandKind::Generate, Element::Air),
                (CommandKind::Consume, Element::Air),
                (CommandKind::Generate, Element::Salt),
                (CommandKind::Consume, Element::Salt),
            ]
        );
    }

    #[test]
    fn water_from_fire_goes_through_salt_and_wheel() {
        let puzzle = Puzzle::new("wheel", vec![single(Element::Fire)], vec![single(Element::Water)]);
        let (pipeline, seq) = solve_commands(&puzzle).unwrap();
        assert_eq!(pipeline.stages().len(), 3);
        assert_eq!(seq.len(), 6);
        assert!(seq.is_balanced());
    }

    #[test]
    fn missing_calcification_is_a_capability_error() {
        let mut puzzle =
            Puzzle::new("salt", vec![single(Element::Air)], vec![single(Element::Salt)]);
        puzzle.allowed_glyphs.remove(&GlyphKind::Calcification);
        let err = solve_commands(&puzzle).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingGlyph {
                glyph: GlyphKind::Calcification,
                ..
            }
        ));
    }

    #[test]
    fn vitae_is_not_produced() {
        let puzzle = Puzzle::new("life", vec![single(Element::Fire)], vec![single(Element::Vitae)]);
        assert!(matches!(
            solve_commands(&puzzle),
            Err(Error::Resolution { .. })
        ));
    }

    #[test]
    fn projection_consumes_one_quicksilver_per_rank() {
        let puzzle = Puzzle::new(
            "iron",
            vec![single(Element::Lead), single(Element::Quicksilver)],
            vec![single(Element::Iron)],
        );
        let (_, seq) = solve_commands(&puzzle).unwrap();
        let quicksilver = seq
            .commands()
            .iter()
            .filter(|c| c.kind == CommandKind::Consume && c.element == Element::Quicksilver)
            .count();
        assert_eq!(quicksilver, 2);
        assert!(seq.is_balanced());
    }

    #[test]
    fn purification_builds_one_stage_per_rank() {
        let mut puzzle = Puzzle::new("tin", vec![single(Element::Lead)], vec![single(Element::Iron)]);
        puzzle.allowed_glyphs.remove(&GlyphKind::Projection);
        let (pipeline, seq) = solve_commands(&puzzle).unwrap();
        assert_eq!(pipeline.stages().len(), 3);
        let lead = seq
            .commands()
            .iter()
            .filter(|c| c.kind == CommandKind::Generate && c.element == Element::Lead)
            .count();
        assert_eq!(lead, 4);
        assert!(seq.is_balanced());
    }

    #[test]
    fn quintessence_requests_each_cardinal_once() {
        let puzzle = Puzzle::new(
            "quint",
            vec![
                single(Element::Air),
                single(Element::Earth),
                single(Element::Fire),
                single(Element::Water),
            ],
            vec![single(Element::Quintessence)],
        );
        let (_, seq) = solve_commands(&puzzle).unwrap();
        let consumed: Vec<_> = seq
            .commands()
            .iter()
            .filter(|c| c.kind == CommandKind::Consume && c.element.is_cardinal())
            .map(|c| c.element)
            .collect();
        assert_eq!(consumed.len(), 4);
        assert_eq!(ElementSet::of(&consumed), ElementSet::cardinals());
    }

    #[test]
    fn buffer_parks_atoms_drawn_ahead_of_need() {
        let puzzle = Puzzle::new(
            "split",
            vec![pair(Element::Fire, Element::Water)],
            vec![single(Element::Fire)],
        );
        let (pipeline, seq) = solve_commands(&puzzle).unwrap();
        assert_eq!(stage_names(&pipeline)[1], "element buffer");
        // The pair is fed right to left, so water arrives first and is parked.
        assert_eq!(seq.count(CommandKind::PrepareToGenerate), 1);
        assert!(seq.is_balanced());
        let last = seq.commands().last().unwrap();
        assert_eq!(last.kind, CommandKind::Consume);
        assert_eq!(last.element, Element::Water);
    }
}
