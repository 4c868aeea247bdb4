//! Part cleanup after synthesis.
//!
//! Removes glyphs no atom ever reached and trims each track to the span
//! its carrier actually travelled, then checks that every bonding glyph
//! an atom pair passed through is one the puzzle allows.

use std::collections::BTreeSet;

use log::{debug, warn};

use super::error::Error;
use crate::model::puzzle::Puzzle;
use crate::model::tree::{NodeId, NodeKind, ObjectTree};

/// What [`optimize_parts`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartsReport {
    pub glyphs_removed: usize,
    pub tracks_removed: usize,
    pub tracks_trimmed: usize,
}

/// Drops unused glyphs and shortens tracks.
///
/// `tracks` pairs each track node with the furthest position its carrier
/// reached; a carrier that never moved loses its track entirely.
pub fn optimize_parts(
    tree: &mut ObjectTree,
    used: &BTreeSet<NodeId>,
    tracks: &[(NodeId, i32)],
) -> PartsReport {
    let mut report = PartsReport::default();

    let unused: Vec<NodeId> = tree
        .iter()
        .filter(|(id, node)| matches!(node.kind, NodeKind::Glyph { .. }) && !used.contains(id))
        .map(|(id, _)| id)
        .collect();
    for id in unused {
        if let Some(NodeKind::Glyph { kind }) = tree.get(id).map(|n| n.kind.clone()) {
            warn!("removing unused {} glyph", kind);
        }
        report.glyphs_removed += tree.remove(id);
    }

    for &(track, reach) in tracks {
        if reach <= 0 {
            report.tracks_removed += tree.remove(track);
        } else if tree.trim_track(track, 0..=reach as usize) {
            report.tracks_trimmed += 1;
        }
    }

    debug!(
        "parts optimized: {} glyph(s) removed, {} track(s) removed, {} track(s) trimmed",
        report.glyphs_removed, report.tracks_removed, report.tracks_trimmed
    );
    report
}

/// Fails when a bonding or unbonding glyph in `used` is not allowed.
///
/// Other glyph kinds are refused when their station is built; bonders are
/// only known once synthesis has decided which edges need them, and only
/// the ones an atom pair actually passed through count.
pub fn check_bonders(tree: &ObjectTree, puzzle: &Puzzle, used: &BTreeSet<NodeId>) -> Result<(), Error> {
    for (_, node) in tree.iter().filter(|(id, _)| used.contains(id)) {
        if let NodeKind::Glyph { kind } = node.kind {
            if kind.is_bonder() && !puzzle.allows_glyph(kind) {
                return Err(Error::missing_glyph(
                    kind,
                    format!("the layout places one at {}", node.pose.position),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::hex::{HexPos, Pose};
    use crate::model::molecule::Molecule;
    use crate::model::types::{Element, GlyphKind};

    fn tree_with_parts() -> (ObjectTree, NodeId, NodeId, NodeId) {
        let mut tree = ObjectTree::new();
        let frame = tree.add(None, Pose::IDENTITY, NodeKind::Frame);
        let used = tree.add(
            Some(frame),
            Pose::at(HexPos::new(1, 1)),
            NodeKind::Glyph {
                kind: GlyphKind::Bonding,
            },
        );
        tree.add(
            Some(frame),
            Pose::at(HexPos::new(2, 1)),
            NodeKind::Glyph {
                kind: GlyphKind::Unbonding,
            },
        );
        let track = tree.add(
            Some(frame),
            Pose::at(HexPos::new(1, -1)),
            NodeKind::Track {
                path: (0..4).map(|q| HexPos::new(q, 0)).collect(),
            },
        );
        (tree, frame, used, track)
    }

    #[test]
    fn unused_glyphs_go_and_tracks_shrink() {
        let (mut tree, _, used, track) = tree_with_parts();
        let report = optimize_parts(&mut tree, &BTreeSet::from([used]), &[(track, 1)]);
        assert_eq!(report.glyphs_removed, 1);
        assert_eq!(report.tracks_trimmed, 1);
        assert_eq!(tree.count(|k| matches!(k, NodeKind::Glyph { .. })), 1);
        let Some(NodeKind::Track { path }) = tree.get(track).map(|n| n.kind.clone()) else {
            panic!("track was removed");
        };
        assert_eq!(path, vec![HexPos::new(0, 0), HexPos::new(1, 0)]);
    }

    #[test]
    fn idle_carriers_lose_their_track() {
        let (mut tree, _, used, track) = tree_with_parts();
        let report = optimize_parts(&mut tree, &BTreeSet::from([used]), &[(track, 0)]);
        assert_eq!(report.tracks_removed, 1);
        assert!(tree.get(track).is_none());
    }

    #[test]
    fn disallowed_bonders_are_reported() {
        let (tree, _, bonder, _) = tree_with_parts();
        let unbonder = tree
            .iter()
            .find(|(_, n)| n.kind == NodeKind::Glyph { kind: GlyphKind::Unbonding })
            .map(|(id, _)| id)
            .unwrap();
        let fire = Molecule::from_elements(&[(Element::Fire, HexPos::ORIGIN)]).unwrap();
        let mut puzzle = Puzzle::new("bonders", vec![fire.clone()], vec![fire]);
        let all = BTreeSet::from([bonder, unbonder]);
        assert!(check_bonders(&tree, &puzzle, &all).is_ok());

        puzzle.allowed_glyphs.remove(&GlyphKind::Unbonding);
        let err = check_bonders(&tree, &puzzle, &all).unwrap_err();
        assert!(err.is_capability());
        // An unbonder no atom ever crossed does not count.
        assert!(check_bonders(&tree, &puzzle, &BTreeSet::from([bonder])).is_ok());
    }
}
