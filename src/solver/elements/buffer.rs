use std::collections::BTreeMap;

use log::debug;

use super::{ElementSet, ElementSource, Upstream};
use crate::model::types::Element;
use crate::solver::commands::{CommandKind, CommandSequence, GeneratorId};
use crate::solver::error::Error;

/// Multi-stack store for atoms a reagent yields before they are needed.
///
/// Sits directly below the reagent aggregate. Parking an atom records a
/// `PrepareToGenerate`; handing it out again records nothing, so the
/// eventual consumer's `Consume` balances the reagent's `Generate`.
#[derive(Debug, Clone)]
pub struct BufferNode {
    id: GeneratorId,
    stock: BTreeMap<Element, usize>,
    held: usize,
    peak: usize,
}

impl BufferNode {
    pub fn new(id: GeneratorId) -> Self {
        Self {
            id,
            stock: BTreeMap::new(),
            held: 0,
            peak: 0,
        }
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }

    /// Most atoms held at once during the run.
    pub fn peak(&self) -> usize {
        self.peak
    }

    fn take(&mut self, candidates: ElementSet) -> Option<Element> {
        let element = candidates
            .iter()
            .find(|e| self.stock.get(e).copied().unwrap_or(0) > 0)?;
        if let Some(count) = self.stock.get_mut(&element) {
            *count -= 1;
        }
        self.held -= 1;
        Some(element)
    }

    fn park(&mut self, element: Element, seq: &mut CommandSequence) {
        seq.push(CommandKind::PrepareToGenerate, element, self.id);
        *self.stock.entry(element).or_insert(0) += 1;
        self.held += 1;
        self.peak = self.peak.max(self.held);
    }

    /// Discards whatever is still parked once every product is built.
    pub fn end_solution(&mut self, seq: &mut CommandSequence) {
        let leftovers = std::mem::take(&mut self.stock);
        for (element, count) in leftovers {
            for _ in 0..count {
                seq.consume(element, self.id);
            }
        }
        if self.held > 0 {
            debug!("buffer discarded {} leftover atom(s)", self.held);
        }
        self.held = 0;
    }
}

impl ElementSource for BufferNode {
    fn produces(&self) -> ElementSet {
        ElementSet::EMPTY
    }

    fn transmute(
        &mut self,
        candidates: ElementSet,
        upstream: &mut Upstream<'_>,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        let input = upstream
            .input_mut()
            .ok_or_else(|| Error::Scheduling("element buffer is not fed by the reagents".into()))?;
        let closest = input.closest(candidates).ok_or_else(|| {
            Error::resolution(&candidates.to_vec(), "no reagent supplies it")
        })?;
        for _ in 0..closest.distance {
            let unwanted = input.emit(closest.reagent, seq)?;
            self.park(unwanted, seq);
        }
        input.emit(closest.reagent, seq)
    }

    fn request(
        &mut self,
        candidates: ElementSet,
        upstream: &mut Upstream<'_>,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        if let Some(element) = self.take(candidates) {
            return Ok(element);
        }
        self.transmute(candidates, upstream, seq)
    }
}
