use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use tsugihagi_core::{SessionRules, POCKET_COUNT};

use crate::board::Board;
use crate::events::EventSink;
use crate::interaction::InteractionController;
use crate::piece::{RenderLayer, RenderState, TINT_NEUTRAL};
use crate::placement::PlacementEngine;
use crate::stash::StashManager;

/// Depth band for pieces lifted onto the overlay layer, ordered by
/// their pocket slot so inspection order is stable.
pub const OVERLAY_DEPTH_BASE: f32 = 20_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayState {
    Closed,
    Open(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    pub ghost_tint_solved: u32,
    pub ghost_tint_unsolved: u32,
    pub ghost_opacity: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            ghost_tint_solved: 0xFF_E08A,
            ghost_tint_unsolved: 0x8A_93A6,
            ghost_opacity: 0.45,
        }
    }
}

/// Non-interactive guide sprite at a template cell's correct position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ghost {
    pub piece_id: usize,
    pub pos: (f32, f32),
    pub tint: u32,
    pub opacity: f32,
    pub solved: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct PieceBaseline {
    render: RenderState,
    bound: bool,
}

/// Modal inspection mode for one pocket. While open it owns every
/// piece's render/interaction state; `close` puts the world back
/// exactly as captured, so an open/close pair with no intervening
/// mutation is invisible.
pub struct FocusOverlay {
    state: OverlayState,
    rules: SessionRules,
    style: OverlayStyle,
    baseline: HashMap<usize, PieceBaseline>,
    released: HashSet<usize>,
    placed: HashSet<usize>,
    ghosts: Vec<Ghost>,
}

impl FocusOverlay {
    pub fn new(rules: SessionRules, style: OverlayStyle) -> Self {
        Self {
            state: OverlayState::Closed,
            rules,
            style,
            baseline: HashMap::new(),
            released: HashSet::new(),
            placed: HashSet::new(),
            ghosts: Vec::new(),
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, OverlayState::Open(_))
    }

    pub fn open_pocket(&self) -> Option<usize> {
        match self.state {
            OverlayState::Open(pocket) => Some(pocket),
            OverlayState::Closed => None,
        }
    }

    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    /// Opens a pocket, force-closing any other pocket first; there is
    /// at most one open overlay per session. The baseline snapshot is
    /// captured exactly once per open.
    pub fn open(
        &mut self,
        board: &mut Board,
        stash: &StashManager,
        interaction: &mut InteractionController,
        pocket: usize,
    ) -> bool {
        if pocket >= POCKET_COUNT {
            return false;
        }
        if self.is_open() {
            self.close(board, interaction);
        }
        log::debug!("focus overlay: open pocket {pocket}");
        for piece in board.pieces() {
            self.baseline.insert(
                piece.id,
                PieceBaseline {
                    render: piece.render,
                    bound: interaction.is_bound(piece.id),
                },
            );
        }
        self.state = OverlayState::Open(pocket);

        let entries: Vec<(usize, u8)> = stash
            .pocket(pocket)
            .map(|record| {
                record
                    .pieces
                    .iter()
                    .map(|entry| (entry.piece_id as usize, entry.slot_index))
                    .collect()
            })
            .unwrap_or_default();
        for (id, slot) in entries {
            board.move_to_overlay_layer(id);
            if let Some(piece) = board.piece_mut(id) {
                piece.render.depth = OVERLAY_DEPTH_BASE + slot as f32;
            }
            interaction.bind_policy(id, PlacementEngine::pocket(self.rules, pocket));
        }
        self.refresh(board, stash);
        true
    }

    /// Re-derives the three-way visibility partition and rebuilds the
    /// ghost guides. Never touches the baseline; call after any
    /// mutation while the overlay stays open.
    pub fn refresh(&mut self, board: &mut Board, stash: &StashManager) {
        let OverlayState::Open(pocket) = self.state else {
            return;
        };
        let Some(record) = stash.pocket(pocket) else {
            return;
        };
        let template = record.template.clone();
        let stashed: HashSet<usize> = record
            .pieces
            .iter()
            .map(|entry| entry.piece_id as usize)
            .collect();

        for id in 0..board.len() {
            let Some(piece) = board.piece_mut(id) else {
                continue;
            };
            if stashed.contains(&id) {
                piece.render.layer = RenderLayer::Overlay;
                piece.render.visible = true;
                piece.render.interactive = true;
            } else if piece.solved {
                let in_template = template
                    .as_ref()
                    .is_some_and(|template| template.contains_piece(id as u32));
                piece.render.visible = in_template;
                piece.render.interactive = false;
            } else {
                piece.render.visible = false;
                piece.render.interactive = false;
            }
        }

        self.ghosts.clear();
        if let Some(template) = template {
            for cell in &template.layout {
                let id = cell.piece_id as usize;
                let solved = board.piece(id).is_some_and(|piece| piece.solved);
                self.ghosts.push(Ghost {
                    piece_id: id,
                    pos: board.geometry().cell_origin(cell.col, cell.row),
                    tint: if solved {
                        self.style.ghost_tint_solved
                    } else {
                        self.style.ghost_tint_unsolved
                    },
                    opacity: self.style.ghost_opacity,
                    solved,
                });
            }
        }
    }

    /// Marks a piece that legitimately left the pocket onto the board
    /// through a template snap; `close` must not roll it back to its
    /// hidden baseline.
    pub fn note_placed(&mut self, piece_id: usize) {
        if self.is_open() {
            self.placed.insert(piece_id);
        }
    }

    /// A stashed piece dragged off the overlay without snapping: its
    /// current pose becomes its new resting pose, it leaves the pocket
    /// and `close` shows it live instead of restoring its baseline.
    pub fn release_to_world(
        &mut self,
        board: &mut Board,
        stash: &mut StashManager,
        events: &EventSink,
        piece_id: usize,
    ) -> bool {
        let OverlayState::Open(pocket) = self.state else {
            return false;
        };
        let Some(piece) = board.piece(piece_id) else {
            return false;
        };
        let (pos, angle) = (piece.pos, piece.rotation);
        if !stash.release_at(pocket, piece_id, pos, angle, events) {
            return false;
        }
        self.released.insert(piece_id);
        self.refresh(board, stash);
        true
    }

    /// Exact restore of every baselined piece (released pieces are
    /// forced live, template-placed pieces keep their solved state),
    /// then drops all per-open state and returns to `Closed`.
    pub fn close(&mut self, board: &mut Board, interaction: &mut InteractionController) {
        if !self.is_open() {
            return;
        }
        log::debug!("focus overlay: close");
        for (id, base) in self.baseline.drain() {
            if self.placed.contains(&id) {
                continue;
            }
            if self.released.contains(&id) {
                if let Some(piece) = board.piece_mut(id) {
                    piece.render.visible = true;
                    piece.render.interactive = true;
                    piece.render.opacity = 1.0;
                    piece.render.tint = TINT_NEUTRAL;
                    piece.render.layer = RenderLayer::Board;
                }
                interaction.bind_policy(id, PlacementEngine::board(self.rules));
                board.assign_top_depth(id);
                continue;
            }
            if let Some(piece) = board.piece_mut(id) {
                piece.render = base.render;
            }
            if base.bound {
                interaction.bind_policy(id, PlacementEngine::board(self.rules));
            }
        }
        self.released.clear();
        self.placed.clear();
        self.ghosts.clear();
        self.state = OverlayState::Closed;
    }
}
