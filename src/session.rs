use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use tsugihagi_core::{BoardGeometry, CropRect, SessionRules, TemplateCellRecord};

use crate::board::Board;
use crate::events::EventSink;
use crate::focus::{FocusOverlay, OverlayStyle};
use crate::input::{BoundsRect, CaptureGesture};
use crate::interaction::InteractionController;
use crate::placement::{PlacementEngine, PlacementScope};
use crate::stash::StashManager;
use crate::storage::KeyValueStore;

/// One running game: wires the board, interaction, pockets and overlay
/// together with a shared event sink. Constructed explicitly at level
/// start and dropped at teardown; nothing here outlives the session.
pub struct GameSession {
    board: Board,
    rules: SessionRules,
    events: EventSink,
    interaction: InteractionController,
    stash: StashManager,
    overlay: FocusOverlay,
    capture: CaptureGesture,
    capture_reopen: Option<usize>,
}

impl GameSession {
    pub fn new(
        level: &str,
        geometry: BoardGeometry,
        rules: SessionRules,
        store: Rc<dyn KeyValueStore>,
    ) -> Self {
        let events = EventSink::new();
        let mut board = Board::new(geometry);
        let mut interaction = InteractionController::new();
        for id in 0..board.len() {
            interaction.attach(&mut board, id, PlacementEngine::board(rules));
        }
        let stash = StashManager::new(level, store);
        stash.apply_to_board(&mut board);
        Self {
            board,
            rules,
            events,
            interaction,
            stash,
            overlay: FocusOverlay::new(rules, OverlayStyle::default()),
            capture: CaptureGesture::idle(),
            capture_reopen: None,
        }
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn stash(&self) -> &StashManager {
        &self.stash
    }

    pub fn overlay(&self) -> &FocusOverlay {
        &self.overlay
    }

    pub fn rules(&self) -> SessionRules {
        self.rules
    }

    pub fn dragging_piece(&self) -> Option<usize> {
        self.interaction.active_piece()
    }

    /// Level-start shuffle of all unsolved pieces.
    pub fn scramble(&mut self, seed: u32) {
        self.board.scatter_unsolved(seed);
    }

    pub fn begin_drag(&mut self, piece_id: usize, pointer: (f32, f32)) -> bool {
        self.interaction.begin_drag(&mut self.board, piece_id, pointer)
    }

    pub fn drag_move(&mut self, pointer: (f32, f32), bounds: Option<BoundsRect>) -> bool {
        self.interaction.drag_move(&mut self.board, pointer, bounds)
    }

    /// Finishes the active drag; returns whether the piece locked in.
    pub fn end_drag(&mut self) -> bool {
        let Some(outcome) =
            self.interaction
                .end_drag(&mut self.board, &mut self.stash, &self.events)
        else {
            return false;
        };
        if self.overlay.is_open() {
            if outcome.snapped
                && matches!(outcome.engine.scope, PlacementScope::PocketTemplate { .. })
            {
                self.overlay.note_placed(outcome.piece_id);
            }
            self.overlay.refresh(&mut self.board, &self.stash);
        }
        outcome.snapped
    }

    pub fn rotate_piece(&mut self, piece_id: usize) -> bool {
        self.interaction.rotate(&mut self.board, piece_id)
    }

    pub fn stash_piece(&mut self, pocket: usize, piece_id: usize) -> bool {
        let stashed = self
            .stash
            .stash(&mut self.board, pocket, piece_id, &self.events);
        if stashed && self.overlay.is_open() {
            self.overlay.refresh(&mut self.board, &self.stash);
        }
        stashed
    }

    pub fn transfer_piece(&mut self, from: usize, to: usize, piece_id: usize) -> bool {
        let moved = self.stash.transfer(from, to, piece_id, &self.events);
        if moved && self.overlay.is_open() {
            self.overlay.refresh(&mut self.board, &self.stash);
        }
        moved
    }

    pub fn retrieve_piece(&mut self, pocket: usize, piece_id: usize) -> bool {
        let retrieved =
            self.stash
                .retrieve_piece(&mut self.board, pocket, piece_id, &self.events);
        if retrieved {
            self.interaction
                .bind_policy(piece_id, PlacementEngine::board(self.rules));
            if self.overlay.is_open() {
                self.overlay.refresh(&mut self.board, &self.stash);
            }
        }
        retrieved
    }

    pub fn retrieve_all(&mut self, pocket: usize) -> usize {
        let ids: Vec<usize> = self
            .stash
            .pocket(pocket)
            .map(|record| {
                record
                    .pieces
                    .iter()
                    .map(|entry| entry.piece_id as usize)
                    .collect()
            })
            .unwrap_or_default();
        let count = self.stash.retrieve_all(&mut self.board, pocket, &self.events);
        if count > 0 {
            for id in ids {
                self.interaction
                    .bind_policy(id, PlacementEngine::board(self.rules));
            }
            if self.overlay.is_open() {
                self.overlay.refresh(&mut self.board, &self.stash);
            }
        }
        count
    }

    pub fn auto_insert_if_solved(&mut self, pocket: usize) -> bool {
        let inserted = self
            .stash
            .auto_insert_if_solved(&mut self.board, pocket, &self.events);
        if inserted && self.overlay.is_open() {
            self.overlay.refresh(&mut self.board, &self.stash);
        }
        inserted
    }

    pub fn can_capture_template(&self, pocket: usize) -> bool {
        self.stash.can_capture_template(&self.board, pocket)
    }

    pub fn open_pocket(&mut self, pocket: usize) -> bool {
        self.overlay
            .open(&mut self.board, &self.stash, &mut self.interaction, pocket)
    }

    pub fn close_pocket(&mut self) {
        self.overlay.close(&mut self.board, &mut self.interaction);
    }

    pub fn release_to_world(&mut self, piece_id: usize) -> bool {
        self.overlay
            .release_to_world(&mut self.board, &mut self.stash, &self.events, piece_id)
    }

    /// Arms the hold-to-capture gesture for a pocket. The overlay is
    /// forced closed for the duration of the gesture and remembered so
    /// a cancelled capture can put it back.
    pub fn begin_template_capture(&mut self, pocket: usize, x: f32, y: f32) -> bool {
        if !self.capture.arm(pocket, x, y) {
            return false;
        }
        self.capture_reopen = self.overlay.open_pocket();
        if self.overlay.is_open() {
            self.close_pocket();
        }
        true
    }

    /// Completes (or cancels) the capture gesture. Both the domain
    /// pointer-up and a window-level fallback may call this; the latch
    /// guarantees only the first call acts. A release off the board,
    /// an empty region or a blocked capture cancels without mutating
    /// any pocket and restores the overlay's prior open state.
    pub fn finish_template_capture(&mut self, end: Option<(f32, f32)>) -> bool {
        let Some((pocket, start)) = self.capture.finish() else {
            return false;
        };
        self.capture.reset();
        let reopen = self.capture_reopen.take();
        let captured = self.apply_capture(pocket, start, end);
        if !captured {
            log::debug!("template capture: cancelled for pocket {pocket}");
            if let Some(prior) = reopen {
                self.open_pocket(prior);
            }
        }
        captured
    }

    fn apply_capture(&mut self, pocket: usize, start: (f32, f32), end: Option<(f32, f32)>) -> bool {
        let Some(end) = end else {
            return false;
        };
        if self.board.geometry().cell_at(end.0, end.1).is_none() {
            return false;
        }
        let crop = crop_rect(start, end);
        let mut layout = Vec::new();
        let mut solved_ids = Vec::new();
        let geometry = *self.board.geometry();
        for piece in self.board.pieces() {
            let origin = geometry.cell_origin(piece.col, piece.row);
            let center = (
                origin.0 + geometry.piece_width * 0.5,
                origin.1 + geometry.piece_height * 0.5,
            );
            if !crop.contains(center.0, center.1) {
                continue;
            }
            layout.push(TemplateCellRecord {
                piece_id: piece.id as u32,
                col: piece.col,
                row: piece.row,
            });
            if piece.solved {
                solved_ids.push(piece.id as u32);
            }
        }
        if layout.is_empty() {
            return false;
        }
        self.stash.capture_template(
            &self.board,
            pocket,
            layout,
            crop,
            solved_ids,
            unix_seconds(),
            &self.events,
        )
    }
}

fn crop_rect(a: (f32, f32), b: (f32, f32)) -> CropRect {
    let x = a.0.min(b.0);
    let y = a.1.min(b.1);
    CropRect {
        x,
        y,
        width: (a.0 - b.0).abs(),
        height: (a.1 - b.1).abs(),
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
