//! Arena of placed parts.
//!
//! Every node stores its pose relative to an optional parent node. World
//! poses are found by walking parent indices, so the tree never holds
//! owning back-references.

use std::fmt;

use super::hex::{HexPos, Pose};
use super::types::{GlyphKind, MechanismKind};

/// Stable identifier of an arm, assigned in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArmId(pub u32);

impl fmt::Display for ArmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arm#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A grouping node with no part of its own.
    Frame,
    Arm {
        kind: MechanismKind,
        extension: i32,
        id: ArmId,
    },
    Track {
        /// Cells of the track relative to the node's pose.
        path: Vec<HexPos>,
    },
    Glyph {
        kind: GlyphKind,
    },
    Reagent {
        index: usize,
    },
    Product {
        index: usize,
        repeating: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub pose: Pose,
    pub parent: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectTree {
    nodes: Vec<Option<Node>>,
}

impl ObjectTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, parent: Option<NodeId>, pose: Pose, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node { kind, pose, parent }));
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Pose of `id` in world coordinates.
    pub fn world_pose(&self, id: NodeId) -> Option<Pose> {
        let mut node = self.get(id)?;
        let mut pose = node.pose;
        while let Some(parent) = node.parent {
            node = self.get(parent)?;
            pose = node.pose.compose(pose);
        }
        Some(pose)
    }

    /// Removes `id` together with every node below it.
    pub fn remove(&mut self, id: NodeId) -> usize {
        let mut removed = 0;
        let mut doomed = vec![id];
        while let Some(target) = doomed.pop() {
            if let Some(slot) = self.nodes.get_mut(target.0) {
                if slot.take().is_some() {
                    removed += 1;
                }
            }
            doomed.extend(
                self.iter()
                    .filter(|(_, n)| n.parent == Some(target))
                    .map(|(child, _)| child),
            );
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, pred: impl Fn(&NodeKind) -> bool) -> usize {
        self.iter().filter(|(_, n)| pred(&n.kind)).count()
    }

    /// Cuts a track down to the path indices in `keep`.
    pub fn trim_track(&mut self, id: NodeId, keep: std::ops::RangeInclusive<usize>) -> bool {
        let Some(Node {
            kind: NodeKind::Track { path },
            ..
        }) = self.get_mut(id)
        else {
            return false;
        };
        let (lo, hi) = (*keep.start(), (*keep.end()).min(path.len().saturating_sub(1)));
        if lo > hi || (lo == 0 && hi + 1 == path.len()) {
            return false;
        }
        *path = path[lo..=hi].to_vec();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::hex::Rotation;

    #[test]
    fn world_pose_composes_parents() {
        let mut tree = ObjectTree::new();
        let frame = tree.add(
            None,
            Pose::new(HexPos::new(4, 0), Rotation::COUNTERCLOCKWISE),
            NodeKind::Frame,
        );
        let glyph = tree.add(
            Some(frame),
            Pose::at(HexPos::new(1, 0)),
            NodeKind::Glyph {
                kind: GlyphKind::Calcification,
            },
        );
        let pose = tree.world_pose(glyph).unwrap();
        assert_eq!(pose.position, HexPos::new(4, 1));
        assert_eq!(pose.rotation, Rotation::COUNTERCLOCKWISE);
    }

    #[test]
    fn remove_drops_subtree() {
        let mut tree = ObjectTree::new();
        let frame = tree.add(None, Pose::IDENTITY, NodeKind::Frame);
        let arm = tree.add(
            Some(frame),
            Pose::IDENTITY,
            NodeKind::Arm {
                kind: MechanismKind::Piston,
                extension: 1,
                id: ArmId(1),
            },
        );
        let other = tree.add(None, Pose::IDENTITY, NodeKind::Frame);
        assert_eq!(tree.remove(frame), 2);
        assert!(tree.get(arm).is_none());
        assert!(tree.get(other).is_some());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn trim_track_keeps_visited_range() {
        let mut tree = ObjectTree::new();
        let path: Vec<HexPos> = (0..4).map(|q| HexPos::new(q, 0)).collect();
        let track = tree.add(None, Pose::IDENTITY, NodeKind::Track { path });
        assert!(tree.trim_track(track, 0..=1));
        match &tree.get(track).unwrap().kind {
            NodeKind::Track { path } => assert_eq!(path.len(), 2),
            other => panic!("unexpected node {:?}", other),
        }
        assert!(!tree.trim_track(track, 0..=5));
    }
}
