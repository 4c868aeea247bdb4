use super::{ElementSet, ElementSource, Upstream};
use crate::model::molecule::Molecule;
use crate::model::types::Element;
use crate::solver::commands::{CommandSequence, GeneratorId};
use crate::solver::error::Error;

/// Order in which a reagent's atoms leave its feeder.
///
/// Straight chains are unbonded from the right end; every other shape is
/// taken apart bottom row first, left to right.
pub fn input_order(molecule: &Molecule) -> Vec<usize> {
    if molecule.atom_count() > 1 && molecule.is_contiguous_row() {
        let mut order: Vec<usize> = (0..molecule.atom_count()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(molecule.atoms()[i].position.q));
        order
    } else {
        molecule.bottom_up_order()
    }
}

/// Replays one reagent's atoms in a fixed cyclic order.
#[derive(Debug, Clone)]
pub struct ReagentGenerator {
    id: GeneratorId,
    sequence: Vec<Element>,
    cursor: usize,
}

impl ReagentGenerator {
    pub fn new(id: GeneratorId, molecule: &Molecule) -> Self {
        let sequence = input_order(molecule)
            .into_iter()
            .map(|i| molecule.atoms()[i].element)
            .collect();
        Self {
            id,
            sequence,
            cursor: 0,
        }
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }

    pub fn sequence(&self) -> &[Element] {
        &self.sequence
    }

    /// Distance to, and identity of, the nearest upcoming atom in
    /// `candidates`, wrapping into the next copy of the reagent.
    pub fn find_closest_element(&self, candidates: ElementSet) -> Option<(usize, Element)> {
        let n = self.sequence.len();
        (0..n)
            .map(|k| (k, self.sequence[(self.cursor + k) % n]))
            .find(|(_, e)| candidates.contains(*e))
    }

    /// Emits the next atom of the sequence.
    pub fn next_atom(&mut self, seq: &mut CommandSequence) -> Element {
        let element = self.sequence[self.cursor];
        self.cursor = (self.cursor + 1) % self.sequence.len();
        seq.generate(element, self.id);
        element
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closest {
    pub reagent: usize,
    pub distance: usize,
    pub element: Element,
}

/// Aggregate of every reagent, the head of the pipeline.
#[derive(Debug, Clone)]
pub struct InputNode {
    reagents: Vec<ReagentGenerator>,
}

impl InputNode {
    pub fn new(reagents: &[Molecule]) -> Self {
        Self {
            reagents: reagents
                .iter()
                .enumerate()
                .map(|(i, m)| ReagentGenerator::new(GeneratorId(i), m))
                .collect(),
        }
    }

    pub fn reagents(&self) -> &[ReagentGenerator] {
        &self.reagents
    }

    /// The reagent whose next matching atom is nearest; ties go to the
    /// earlier reagent.
    pub fn closest(&self, candidates: ElementSet) -> Option<Closest> {
        self.reagents
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                r.find_closest_element(candidates).map(|(distance, element)| Closest {
                    reagent: i,
                    distance,
                    element,
                })
            })
            .min_by_key(|c| (c.distance, c.reagent))
    }

    pub fn emit(&mut self, reagent: usize, seq: &mut CommandSequence) -> Result<Element, Error> {
        let generator = self
            .reagents
            .get_mut(reagent)
            .ok_or_else(|| Error::Scheduling(format!("no reagent {}", reagent)))?;
        Ok(generator.next_atom(seq))
    }
}

impl ElementSource for InputNode {
    fn produces(&self) -> ElementSet {
        self.reagents
            .iter()
            .flat_map(|r| r.sequence.iter().copied())
            .collect()
    }

    fn transmute(
        &mut self,
        candidates: ElementSet,
        _upstream: &mut Upstream<'_>,
        _seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        Err(Error::resolution(
            &candidates.to_vec(),
            "no reagent supplies it",
        ))
    }

    fn request(
        &mut self,
        candidates: ElementSet,
        upstream: &mut Upstream<'_>,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        let Some(closest) = self.closest(candidates) else {
            return self.transmute(candidates, upstream, seq);
        };
        if closest.distance > 0 {
            return Err(Error::resolution(
                &candidates.to_vec(),
                format!(
                    "reagent {} would discard {} atom(s) with no buffer to hold them",
                    closest.reagent, closest.distance
                ),
            ));
        }
        self.emit(closest.reagent, seq)
    }
}
