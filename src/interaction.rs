use std::collections::HashMap;

use tsugihagi_core::normalize_angle;

use crate::board::Board;
use crate::events::{EventSink, GameEvent};
use crate::input::BoundsRect;
use crate::placement::PlacementEngine;
use crate::stash::StashManager;

/// Depth applied to the piece under the pointer for the duration of a
/// drag, above both board and overlay stacking.
pub const DRAG_DEPTH: f32 = 100_000.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragOutcome {
    pub piece_id: usize,
    pub snapped: bool,
    pub engine: PlacementEngine,
}

#[derive(Clone, Copy, Debug)]
struct DragState {
    piece_id: usize,
    grab_offset: (f32, f32),
}

/// Binds one placement policy per piece through a side table keyed by
/// piece id; nothing is stashed on the piece entity itself, so a piece
/// can be detached and rebound (board vs pocket policy) without
/// leaking stale handlers. At most one piece is mid-drag per session.
#[derive(Default)]
pub struct InteractionController {
    bindings: HashMap<usize, PlacementEngine>,
    drag: Option<DragState>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a piece. Attaching an already-bound piece is a no-op that
    /// only re-enables interactivity, so handlers never double up;
    /// returns true only when a new binding was created.
    pub fn attach(&mut self, board: &mut Board, piece_id: usize, engine: PlacementEngine) -> bool {
        if board.piece(piece_id).is_none() {
            return false;
        }
        if self.bindings.contains_key(&piece_id) {
            board.enable_piece_interaction(piece_id, true);
            return false;
        }
        self.bindings.insert(piece_id, engine);
        board.enable_piece_interaction(piece_id, true);
        true
    }

    pub fn detach(&mut self, board: &mut Board, piece_id: usize) {
        if self.bindings.remove(&piece_id).is_some() {
            board.enable_piece_interaction(piece_id, false);
        }
    }

    /// Swaps the policy for a piece without touching its render or
    /// interactivity state; creates the binding if absent.
    pub fn bind_policy(&mut self, piece_id: usize, engine: PlacementEngine) {
        self.bindings.insert(piece_id, engine);
    }

    pub fn is_bound(&self, piece_id: usize) -> bool {
        self.bindings.contains_key(&piece_id)
    }

    pub fn engine_for(&self, piece_id: usize) -> Option<PlacementEngine> {
        self.bindings.get(&piece_id).copied()
    }

    pub fn active_piece(&self) -> Option<usize> {
        self.drag.map(|drag| drag.piece_id)
    }

    pub fn begin_drag(&mut self, board: &mut Board, piece_id: usize, pointer: (f32, f32)) -> bool {
        if self.drag.is_some() || !self.bindings.contains_key(&piece_id) {
            return false;
        }
        let Some(piece) = board.piece(piece_id) else {
            return false;
        };
        if piece.solved || !piece.render.visible || !piece.render.interactive {
            return false;
        }
        let grab_offset = (pointer.0 - piece.pos.0, pointer.1 - piece.pos.1);
        if let Some(piece) = board.piece_mut(piece_id) {
            piece.render.depth = DRAG_DEPTH;
        }
        self.drag = Some(DragState {
            piece_id,
            grab_offset,
        });
        true
    }

    /// Moves the dragged piece, clamped to the caller-supplied bounds
    /// when given (callers recompute camera-relative bounds per call).
    pub fn drag_move(
        &mut self,
        board: &mut Board,
        pointer: (f32, f32),
        bounds: Option<BoundsRect>,
    ) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        let mut x = pointer.0 - drag.grab_offset.0;
        let mut y = pointer.1 - drag.grab_offset.1;
        if let Some(bounds) = bounds {
            (x, y) = bounds.clamp_point(x, y);
        }
        if let Some(piece) = board.piece_mut(drag.piece_id) {
            piece.pos = (x, y);
        }
        true
    }

    /// Ends the active drag: restores normal stacking, runs the bound
    /// policy's snap and reports the drag end plus a save request
    /// regardless of the snap outcome.
    pub fn end_drag(
        &mut self,
        board: &mut Board,
        stash: &mut StashManager,
        events: &EventSink,
    ) -> Option<DragOutcome> {
        let drag = self.drag.take()?;
        board.assign_top_depth(drag.piece_id);
        let snapped = match self.bindings.get(&drag.piece_id) {
            Some(engine) => engine.try_snap(board, stash, events, drag.piece_id),
            None => false,
        };
        let engine = self
            .bindings
            .get(&drag.piece_id)
            .copied()
            .unwrap_or_else(|| PlacementEngine::board(Default::default()));
        events.emit(GameEvent::DragEnded {
            piece_id: drag.piece_id,
            snapped,
        });
        events.emit(GameEvent::SaveRequested);
        Some(DragOutcome {
            piece_id: drag.piece_id,
            snapped,
            engine,
        })
    }

    /// Secondary-button rotate: a quarter turn clockwise while the
    /// piece is unsolved.
    pub fn rotate(&self, board: &mut Board, piece_id: usize) -> bool {
        let Some(engine) = self.bindings.get(&piece_id) else {
            return false;
        };
        let step = engine.rules.rotation_step_deg;
        let Some(piece) = board.piece_mut(piece_id) else {
            return false;
        };
        if piece.solved {
            return false;
        }
        piece.rotation = normalize_angle(piece.rotation + step);
        true
    }
}
