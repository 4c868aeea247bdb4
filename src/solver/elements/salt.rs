use super::{ElementSet, ElementSource, Upstream};
use crate::model::types::Element;
use crate::solver::commands::{CommandSequence, GeneratorId};
use crate::solver::error::Error;

/// Calcifies a cardinal element into salt.
#[derive(Debug, Clone)]
pub struct SaltNode {
    id: GeneratorId,
}

impl SaltNode {
    pub fn new(id: GeneratorId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }
}

impl ElementSource for SaltNode {
    fn produces(&self) -> ElementSet {
        ElementSet::single(Element::Salt)
    }

    fn transmute(
        &mut self,
        candidates: ElementSet,
        upstream: &mut Upstream<'_>,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        if !candidates.contains(Element::Salt) {
            return Err(Error::resolution(
                &candidates.to_vec(),
                "calcification only produces salt",
            ));
        }
        let cardinal = upstream.request(ElementSet::cardinals() & upstream.outputs(), seq)?;
        seq.consume(cardinal, self.id);
        seq.generate(Element::Salt, self.id);
        Ok(Element::Salt)
    }
}
