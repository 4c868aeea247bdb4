use super::{ElementSet, ElementSource, Upstream};
use crate::model::types::Element;
use crate::solver::commands::{CommandSequence, GeneratorId};
use crate::solver::error::Error;

/// Unifies one of each cardinal into quintessence.
#[derive(Debug, Clone)]
pub struct QuintessenceNode {
    id: GeneratorId,
}

impl QuintessenceNode {
    pub fn new(id: GeneratorId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }
}

impl ElementSource for QuintessenceNode {
    fn produces(&self) -> ElementSet {
        ElementSet::single(Element::Quintessence)
    }

    fn transmute(
        &mut self,
        candidates: ElementSet,
        upstream: &mut Upstream<'_>,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        if !candidates.contains(Element::Quintessence) {
            return Err(Error::resolution(
                &candidates.to_vec(),
                "unification only produces quintessence",
            ));
        }
        // Cardinals may arrive in any order.
        let mut remaining = ElementSet::cardinals();
        while !remaining.is_empty() {
            let cardinal = upstream.request(remaining, seq)?;
            remaining.remove(cardinal);
            seq.consume(cardinal, self.id);
        }
        seq.generate(Element::Quintessence, self.id);
        Ok(Element::Quintessence)
    }
}
