use super::{ElementSet, ElementSource, Upstream};
use crate::model::types::Element;
use crate::solver::commands::{CommandSequence, GeneratorId};
use crate::solver::error::Error;

/// Atoms carried by the wheel, indexed counterclockwise from its rotation.
pub const WHEEL_ELEMENTS: [Element; 6] = [
    Element::Salt,
    Element::Water,
    Element::Air,
    Element::Salt,
    Element::Fire,
    Element::Earth,
];

/// Duplicates a wheel atom onto salt, turning it into any cardinal.
#[derive(Debug, Clone)]
pub struct VanBerloNode {
    id: GeneratorId,
}

impl VanBerloNode {
    pub fn new(id: GeneratorId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }
}

impl ElementSource for VanBerloNode {
    fn produces(&self) -> ElementSet {
        ElementSet::cardinals()
    }

    fn transmute(
        &mut self,
        candidates: ElementSet,
        upstream: &mut Upstream<'_>,
        seq: &mut CommandSequence,
    ) -> Result<Element, Error> {
        let target = (candidates & ElementSet::cardinals())
            .iter()
            .next()
            .ok_or_else(|| {
                Error::resolution(&candidates.to_vec(), "the wheel only yields cardinals")
            })?;
        let salt = upstream.request(ElementSet::single(Element::Salt), seq)?;
        seq.consume(salt, self.id);
        seq.generate(target, self.id);
        Ok(target)
    }
}
