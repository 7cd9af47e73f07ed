use tsugihagi_core::math::distance;
use tsugihagi_core::SessionRules;

use crate::board::Board;
use crate::events::{EventSink, GameEvent};
use crate::stash::StashManager;

/// Where a snap is allowed to land. `Board` is the default engine for
/// free pieces; `PocketTemplate` is the restricted engine the focus
/// overlay binds to stashed pieces, which additionally requires the
/// piece to belong to the open pocket and appear in its template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementScope {
    Board,
    PocketTemplate { pocket: usize },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementEngine {
    pub rules: SessionRules,
    pub scope: PlacementScope,
}

impl PlacementEngine {
    pub fn board(rules: SessionRules) -> Self {
        Self {
            rules,
            scope: PlacementScope::Board,
        }
    }

    pub fn pocket(rules: SessionRules, pocket: usize) -> Self {
        Self {
            rules,
            scope: PlacementScope::PocketTemplate { pocket },
        }
    }

    /// A piece may lock in iff it is unsolved, strictly inside the snap
    /// distance of its target and at exactly zero rotation. The pocket
    /// scope adds the membership test; with no template captured,
    /// nothing snaps there at all.
    pub fn can_snap(&self, board: &Board, stash: &StashManager, piece_id: usize) -> bool {
        let Some(piece) = board.piece(piece_id) else {
            return false;
        };
        if piece.solved {
            return false;
        }
        if distance(piece.pos, piece.target) >= self.rules.snap_distance {
            return false;
        }
        if piece.rotation != 0.0 {
            return false;
        }
        match self.scope {
            PlacementScope::Board => true,
            PlacementScope::PocketTemplate { pocket } => {
                stash.pocket(pocket).is_some_and(|record| {
                    record.holds(piece_id as u32)
                        && record
                            .template
                            .as_ref()
                            .is_some_and(|template| template.contains_piece(piece_id as u32))
                })
            }
        }
    }

    /// Applies the solved state on success and reports it exactly once;
    /// on failure the piece is untouched.
    pub fn try_snap(
        &self,
        board: &mut Board,
        stash: &mut StashManager,
        events: &EventSink,
        piece_id: usize,
    ) -> bool {
        if !self.can_snap(board, stash, piece_id) {
            return false;
        }
        match self.scope {
            PlacementScope::Board => {
                if !board.set_piece_solved(piece_id) {
                    return false;
                }
                events.emit(GameEvent::PiecePlaced { piece_id });
                true
            }
            PlacementScope::PocketTemplate { pocket } => {
                stash.place_from_template(board, pocket, piece_id, events)
            }
        }
    }
}
