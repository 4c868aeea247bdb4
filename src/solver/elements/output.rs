use log::debug;

use super::{ElementSet, Upstream};
use crate::model::molecule::Molecule;
use crate::model::types::Element;
use crate::solver::commands::{CommandKind, CommandSequence, GeneratorId};
use crate::solver::error::Error;

/// What the terminal node pulls for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPlan {
    pub index: usize,
    /// Elements in assembly order: top row first, left to right.
    pub order: Vec<Element>,
    pub rounds: u32,
    pub repeating: bool,
}

/// Terminal node: consumes every atom of every product.
#[derive(Debug, Clone)]
pub struct OutputNode {
    id: GeneratorId,
    products: Vec<ProductPlan>,
}

impl OutputNode {
    /// Plans the products, replicating non-repeating ones when only some
    /// products repeat, since every copy of a repeating product is built at
    /// once.
    pub fn new(id: GeneratorId, products: &[Molecule], repeating: &[bool], replication: u32) -> Self {
        let any = repeating.iter().any(|&r| r);
        let all = !repeating.is_empty() && repeating.iter().all(|&r| r);
        let products = products
            .iter()
            .enumerate()
            .map(|(index, molecule)| {
                let repeats = repeating.get(index).copied().unwrap_or(false);
                let rounds = if any && !all && !repeats {
                    replication
                } else {
                    1
                };
                ProductPlan {
                    index,
                    order: molecule
                        .top_down_order()
                        .into_iter()
                        .map(|i| molecule.atoms()[i].element)
                        .collect(),
                    rounds,
                    repeating: repeats,
                }
            })
            .collect();
        Self { id, products }
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }

    pub fn products(&self) -> &[ProductPlan] {
        &self.products
    }

    pub fn run(&mut self, upstream: &mut Upstream<'_>, seq: &mut CommandSequence) -> Result<(), Error> {
        let rounds = self.products.iter().map(|p| p.rounds).max().unwrap_or(0);
        for round in 0..rounds {
            for product in self.products.iter().filter(|p| p.rounds > round) {
                for &element in &product.order {
                    let got = upstream.request(ElementSet::single(element), seq)?;
                    seq.push_grouped(CommandKind::Consume, got, self.id, Some(product.index));
                }
            }
            debug!("output round {} complete", round + 1);
        }
        Ok(())
    }
}
