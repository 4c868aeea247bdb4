use super::{ElementSet, ElementSource, Upstream};
use crate::model::types::Element;
use crate::solver::commands::{CommandSequence, GeneratorId};
use crate::solver::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetalMethod {
    /// One glyph raising a metal one rank per quicksilver.
    Projection {
        /// Rank of the best supplied metal below every target.
        base: usize,
    },
    /// One glyph merging two metals of `rank - 1` into one of `rank`.
    Purification { rank: usize },
}

/// Refines lower metals into higher ones.
#[derive(Debug, Clone)]
pub struct MetalNode {
    id: GeneratorId,
    method: MetalMethod,
}

impl MetalNode {
    pub fn projection(id: GeneratorId, base: usize) -> Self {
        Self {
            id,
            method: MetalMethod::Projection { base },
        }
    }

    pub fn purification(id: GeneratorId, rank: usize) -> Result<Self, Error> {
        if rank == 0 || Element::metal_of_rank(rank).is_none() {
            return Err(Error::Scheduling(format!(
                "no purification stage can produce metal rank {}",
                rank
            )));
        }
        Ok(Self {
            id,
            method: MetalMethod::Purification { rank },
        })
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }

    pub fn method(&self) -> MetalMethod {
        self.method
    }

    pub fn describe(&self) -> String {
        match self.method {
            MetalMethod::Projection { .. } => "metal (projection)".to_string(),
            MetalMethod::Purification { rank } => format!(
                "metal (purification to {})",
                Element::metal_of_rank(rank).map(|e| e.name()).unwrap_or("?")
            ),
        }
    }

    fn project(
        &mut self,
        target: Element,
        upstream: &mut Upstream<'_>,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        let target_rank = target.metal_rank().unwrap_or(0);
        let lower: ElementSet = Element::METALS[..target_rank].iter().copied().collect();
        let metal = upstream.request(lower & upstream.outputs(), seq)?;
        seq.consume(metal, self.id);
        let steps = target_rank - metal.metal_rank().unwrap_or(0);
        for _ in 0..steps {
            let quicksilver = upstream.request(ElementSet::single(Element::Quicksilver), seq)?;
            seq.consume(quicksilver, self.id);
        }
        seq.generate(target, self.id);
        Ok(target)
    }

    fn purify(
        &mut self,
        target: Element,
        rank: usize,
        upstream: &mut Upstream<'_>,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        let lower = Element::metal_of_rank(rank - 1)
            .ok_or_else(|| Error::Scheduling("purification below lead".into()))?;
        for _ in 0..2 {
            let metal = upstream.request(ElementSet::single(lower), seq)?;
            seq.consume(metal, self.id);
        }
        seq.generate(target, self.id);
        Ok(target)
    }
}

impl ElementSource for MetalNode {
    fn produces(&self) -> ElementSet {
        match self.method {
            MetalMethod::Projection { base } => Element::METALS[base + 1..].iter().copied().collect(),
            MetalMethod::Purification { rank } => Element::metal_of_rank(rank)
                .map(ElementSet::single)
                .unwrap_or(ElementSet::EMPTY),
        }
    }

    fn transmute(
        &mut self,
        candidates: ElementSet,
        upstream: &mut Upstream<'_>,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        // The lowest reachable target needs the fewest refinement steps.
        let target = (candidates & self.produces()).iter().min_by_key(|e| e.metal_rank());
        let Some(target) = target else {
            return Err(Error::resolution(
                &candidates.to_vec(),
                format!("{} cannot produce it", self.describe()),
            ));
        };
        match self.method {
            MetalMethod::Projection { .. } => self.project(target, upstream, seq),
            MetalMethod::Purification { rank } => self.purify(target, rank, upstream, seq),
        }
    }
}
