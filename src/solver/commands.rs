use std::collections::BTreeMap;
use std::fmt;

use log::trace;

use crate::model::types::Element;

/// Identity of the element generator that recorded a command.
///
/// Reagents take the first identifiers in puzzle order; pipeline stages
/// follow in conveyor order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneratorId(pub usize);

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Generate,
    Consume,
    /// The generated atom is parked in a buffer instead of being consumed.
    PrepareToGenerate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub element: Element,
    pub generator: GeneratorId,
    pub group: Option<usize>,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            CommandKind::Generate => "generate",
            CommandKind::Consume => "consume",
            CommandKind::PrepareToGenerate => "park",
        };
        write!(f, "{} {} @ {}", verb, self.element, self.generator)?;
        if let Some(group) = self.group {
            write!(f, " [{}]", group)?;
        }
        Ok(())
    }
}

/// Append-only log of chemistry steps in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSequence {
    commands: Vec<Command>,
}

impl CommandSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: CommandKind, element: Element, generator: GeneratorId) {
        self.push_grouped(kind, element, generator, None);
    }

    pub fn push_grouped(
        &mut self,
        kind: CommandKind,
        element: Element,
        generator: GeneratorId,
        group: Option<usize>,
    ) {
        let command = Command {
            kind,
            element,
            generator,
            group,
        };
        trace!("command #{}: {}", self.commands.len(), command);
        self.commands.push(command);
    }

    pub fn generate(&mut self, element: Element, generator: GeneratorId) {
        self.push(CommandKind::Generate, element, generator);
    }

    pub fn consume(&mut self, element: Element, generator: GeneratorId) {
        self.push(CommandKind::Consume, element, generator);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn count(&self, kind: CommandKind) -> usize {
        self.commands.iter().filter(|c| c.kind == kind).count()
    }

    /// Generated minus consumed atoms, per element.
    ///
    /// Parked atoms count as generated until they are consumed.
    pub fn balance(&self) -> BTreeMap<Element, i64> {
        let mut balance = BTreeMap::new();
        for command in &self.commands {
            let delta = match command.kind {
                CommandKind::Generate => 1,
                CommandKind::Consume => -1,
                CommandKind::PrepareToGenerate => 0,
            };
            *balance.entry(command.element).or_insert(0) += delta;
        }
        balance
    }

    pub fn is_balanced(&self) -> bool {
        self.balance().values().all(|&v| v == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_counts_generate_against_consume() {
        let mut seq = CommandSequence::new();
        seq.generate(Element::Fire, GeneratorId(0));
        seq.push(CommandKind::PrepareToGenerate, Element::Fire, GeneratorId(1));
        assert!(!seq.is_balanced());
        seq.consume(Element::Fire, GeneratorId(2));
        assert!(seq.is_balanced());
        assert_eq!(seq.count(CommandKind::Generate), 1);
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn display_includes_group() {
        let command = Command {
            kind: CommandKind::Consume,
            element: Element::Salt,
            generator: GeneratorId(4),
            group: Some(1),
        };
        assert_eq!(command.to_string(), "consume salt @ g4 [1]");
    }
}
