use std::rc::Rc;

use rand::RngExt;

use tsugihagi_core::{
    CropRect, PocketPieceRecord, PocketRecord, PocketSaveState, TemplateCellRecord,
    TemplateRecord, POCKET_COUNT,
};

use crate::board::Board;
use crate::events::{EventSink, GameEvent};
use crate::piece::{RenderLayer, TINT_NEUTRAL};
use crate::storage::{load_pockets, pocket_save_key, save_pockets, KeyValueStore};

/// Fraction of the smaller piece dimension used to jitter the fallback
/// retrieve position around the board center.
const RETRIEVE_JITTER_RATIO: f32 = 1.5;

/// Three independent off-board pockets, each holding up to sixteen
/// pieces plus an optional captured template. Every mutating operation
/// fails closed (returns false, changes nothing) and persists the full
/// three-pocket snapshot before emitting `PocketUpdated`.
pub struct StashManager {
    pockets: Vec<PocketRecord>,
    save_key: String,
    store: Rc<dyn KeyValueStore>,
}

impl StashManager {
    /// Restores any prior save for this level; missing or corrupt
    /// payloads start the pockets empty.
    pub fn new(level: &str, store: Rc<dyn KeyValueStore>) -> Self {
        let save_key = pocket_save_key(level);
        let pockets = load_pockets(store.as_ref(), &save_key)
            .map(|state| state.pockets)
            .unwrap_or_else(|| PocketSaveState::empty().pockets);
        Self {
            pockets,
            save_key,
            store,
        }
    }

    pub fn pocket(&self, pocket: usize) -> Option<&PocketRecord> {
        self.pockets.get(pocket)
    }

    pub fn snapshot(&self) -> PocketSaveState {
        PocketSaveState {
            version: tsugihagi_core::POCKET_SAVE_VERSION,
            pockets: self.pockets.clone(),
        }
    }

    /// Pocket currently holding the piece, if any. A piece id appears
    /// in at most one pocket at a time.
    pub fn holder_of(&self, piece_id: usize) -> Option<usize> {
        self.pockets
            .iter()
            .position(|pocket| pocket.holds(piece_id as u32))
    }

    /// Re-applies hidden/non-interactive state to every stashed piece,
    /// used once after restoring a save into a fresh board.
    pub fn apply_to_board(&self, board: &mut Board) {
        for pocket in &self.pockets {
            for entry in &pocket.pieces {
                let id = entry.piece_id as usize;
                board.set_piece_visible(id, false);
                board.enable_piece_interaction(id, false);
            }
        }
    }

    pub fn stash(
        &mut self,
        board: &mut Board,
        pocket: usize,
        piece_id: usize,
        events: &EventSink,
    ) -> bool {
        if pocket >= POCKET_COUNT {
            return false;
        }
        let Some(piece) = board.piece(piece_id) else {
            return false;
        };
        if self.holder_of(piece_id).is_some() {
            return false;
        }
        let Some(slot) = self.pockets[pocket].free_slot() else {
            return false;
        };
        let record = PocketPieceRecord {
            piece_id: piece_id as u32,
            angle: piece.rotation,
            slot_index: slot,
            last_world_pos: Some(piece.pos),
        };
        self.pockets[pocket].pieces.push(record);
        board.set_piece_visible(piece_id, false);
        board.enable_piece_interaction(piece_id, false);
        self.persist_and_notify(events);
        true
    }

    /// Atomic move between pockets: on any failure both pockets are
    /// left exactly as they were.
    pub fn transfer(
        &mut self,
        from: usize,
        to: usize,
        piece_id: usize,
        events: &EventSink,
    ) -> bool {
        if from >= POCKET_COUNT || to >= POCKET_COUNT {
            return false;
        }
        let id = piece_id as u32;
        if !self.pockets[from].holds(id) {
            return false;
        }
        if self.pockets[to].is_full() || self.pockets[to].holds(id) {
            return false;
        }
        let Some(slot) = self.pockets[to].free_slot() else {
            return false;
        };
        let Some(position) = self.pockets[from]
            .pieces
            .iter()
            .position(|entry| entry.piece_id == id)
        else {
            return false;
        };
        let mut entry = self.pockets[from].pieces.remove(position);
        entry.slot_index = slot;
        self.pockets[to].pieces.push(entry);
        self.persist_and_notify(events);
        true
    }

    pub fn retrieve_piece(
        &mut self,
        board: &mut Board,
        pocket: usize,
        piece_id: usize,
        events: &EventSink,
    ) -> bool {
        if pocket >= POCKET_COUNT {
            return false;
        }
        let id = piece_id as u32;
        let Some(position) = self.pockets[pocket]
            .pieces
            .iter()
            .position(|entry| entry.piece_id == id)
        else {
            return false;
        };
        let entry = self.pockets[pocket].pieces.remove(position);
        restore_piece(board, &entry);
        self.persist_and_notify(events);
        true
    }

    /// Returns how many pieces came back out.
    pub fn retrieve_all(&mut self, board: &mut Board, pocket: usize, events: &EventSink) -> usize {
        if pocket >= POCKET_COUNT {
            return 0;
        }
        let entries = std::mem::take(&mut self.pockets[pocket].pieces);
        if entries.is_empty() {
            return 0;
        }
        let count = entries.len();
        for entry in &entries {
            restore_piece(board, entry);
        }
        self.persist_and_notify(events);
        count
    }

    /// True when a fresh capture would not clobber an unfinished one:
    /// either no template exists, or every id in the existing template
    /// is solved on the main board.
    pub fn can_capture_template(&self, board: &Board, pocket: usize) -> bool {
        let Some(record) = self.pockets.get(pocket) else {
            return false;
        };
        match &record.template {
            None => true,
            Some(template) => template.layout.iter().all(|cell| {
                board
                    .piece(cell.piece_id as usize)
                    .is_some_and(|piece| piece.solved)
            }),
        }
    }

    pub fn capture_template(
        &mut self,
        board: &Board,
        pocket: usize,
        layout: Vec<TemplateCellRecord>,
        crop: CropRect,
        solved_ids: Vec<u32>,
        captured_at: u64,
        events: &EventSink,
    ) -> bool {
        if pocket >= POCKET_COUNT || layout.is_empty() {
            return false;
        }
        if layout.iter().any(|cell| cell.piece_id as usize >= board.len()) {
            return false;
        }
        if !self.can_capture_template(board, pocket) {
            events.emit(GameEvent::CaptureBlocked { pocket });
            return false;
        }
        self.pockets[pocket].template = Some(TemplateRecord {
            layout,
            captured_at,
            crop,
            solved_ids,
        });
        save_pockets(self.store.as_ref(), &self.save_key, &self.snapshot());
        events.emit(GameEvent::TemplateCaptured { pocket });
        events.emit(GameEvent::PocketUpdated {
            snapshot: self.snapshot(),
        });
        true
    }

    /// Template-guided placement of one stashed piece: teleports it to
    /// its recorded grid cell, solves it, removes it from the pocket
    /// and records it in the template's solved set.
    pub fn place_from_template(
        &mut self,
        board: &mut Board,
        pocket: usize,
        piece_id: usize,
        events: &EventSink,
    ) -> bool {
        if pocket >= POCKET_COUNT {
            return false;
        }
        let id = piece_id as u32;
        let Some(cell) = self.pockets[pocket]
            .template
            .as_ref()
            .and_then(|template| template.cell_for(id))
        else {
            return false;
        };
        let Some(position) = self.pockets[pocket]
            .pieces
            .iter()
            .position(|entry| entry.piece_id == id)
        else {
            return false;
        };
        let world = board.geometry().cell_origin(cell.0, cell.1);
        if !board.place_solved_at(piece_id, world) {
            return false;
        }
        self.pockets[pocket].pieces.remove(position);
        if let Some(template) = self.pockets[pocket].template.as_mut() {
            template.solved_ids.push(id);
        }
        save_pockets(self.store.as_ref(), &self.save_key, &self.snapshot());
        events.emit(GameEvent::PiecePlaced { piece_id });
        events.emit(GameEvent::PocketUpdated {
            snapshot: self.snapshot(),
        });
        true
    }

    /// Fast path: when the pocket holds exactly the template's
    /// still-unsolved pieces, place all of them in one pass and clear
    /// both the piece list and the template.
    pub fn auto_insert_if_solved(
        &mut self,
        board: &mut Board,
        pocket: usize,
        events: &EventSink,
    ) -> bool {
        if pocket >= POCKET_COUNT {
            return false;
        }
        let Some(template) = self.pockets[pocket].template.clone() else {
            return false;
        };
        let entries = &self.pockets[pocket].pieces;
        if entries.is_empty() || entries.len() != template.unsolved_count() {
            return false;
        }
        let complete = entries.iter().all(|entry| {
            template.contains_piece(entry.piece_id) && !template.is_solved(entry.piece_id)
        });
        if !complete {
            return false;
        }
        let mut placed = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = entry.piece_id as usize;
            let Some(cell) = template.cell_for(entry.piece_id) else {
                return false;
            };
            placed.push((id, board.geometry().cell_origin(cell.0, cell.1)));
        }
        for &(id, world) in &placed {
            board.place_solved_at(id, world);
        }
        self.pockets[pocket].pieces.clear();
        self.pockets[pocket].template = None;
        save_pockets(self.store.as_ref(), &self.save_key, &self.snapshot());
        for &(id, _) in &placed {
            events.emit(GameEvent::PiecePlaced { piece_id: id });
        }
        events.emit(GameEvent::PocketUpdated {
            snapshot: self.snapshot(),
        });
        true
    }

    /// Drops a piece out of a pocket at an explicit world pose, used
    /// when a piece is dragged off the focus overlay back onto the
    /// board without snapping.
    pub fn release_at(
        &mut self,
        pocket: usize,
        piece_id: usize,
        pos: (f32, f32),
        angle: f32,
        events: &EventSink,
    ) -> bool {
        if pocket >= POCKET_COUNT {
            return false;
        }
        let id = piece_id as u32;
        let Some(position) = self.pockets[pocket]
            .pieces
            .iter()
            .position(|entry| entry.piece_id == id)
        else {
            return false;
        };
        let mut entry = self.pockets[pocket].pieces.remove(position);
        entry.last_world_pos = Some(pos);
        entry.angle = angle;
        self.persist_and_notify(events);
        true
    }

    fn persist_and_notify(&self, events: &EventSink) {
        let snapshot = self.snapshot();
        save_pockets(self.store.as_ref(), &self.save_key, &snapshot);
        events.emit(GameEvent::PocketUpdated { snapshot });
    }
}

fn restore_piece(board: &mut Board, entry: &PocketPieceRecord) {
    let id = entry.piece_id as usize;
    let pos = entry
        .last_world_pos
        .unwrap_or_else(|| fallback_position(board));
    let Some(piece) = board.piece_mut(id) else {
        return;
    };
    piece.pos = pos;
    piece.rotation = entry.angle;
    piece.solved = false;
    piece.render.visible = true;
    piece.render.interactive = true;
    piece.render.opacity = 1.0;
    piece.render.tint = TINT_NEUTRAL;
    piece.render.layer = RenderLayer::Board;
}

fn fallback_position(board: &Board) -> (f32, f32) {
    let geometry = board.geometry();
    let center = geometry.board_center();
    let jitter = geometry.piece_width.min(geometry.piece_height) * RETRIEVE_JITTER_RATIO;
    let mut rng = rand::rng();
    (
        center.0 + rng.random_range(-jitter..jitter) - geometry.piece_width * 0.5,
        center.1 + rng.random_range(-jitter..jitter) - geometry.piece_height * 0.5,
    )
}
