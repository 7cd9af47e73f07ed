use tsugihagi_core::{rand_range, BoardGeometry};

use crate::piece::{Piece, RenderLayer, RenderState, TINT_NEUTRAL};

pub const DEPTH_SOLVED: f32 = 0.0;
pub const DEPTH_BASE: f32 = 10.0;
/// Margin around the board, as a fraction of the board's larger
/// dimension, that scattered pieces may occupy.
pub const SCATTER_MARGIN_RATIO: f32 = 0.35;

/// Owns the ordered, index-stable piece list for one level; piece ids
/// are indices into that list. Everything else (placement, pockets,
/// the focus overlay) mutates pieces through this type.
pub struct Board {
    geometry: BoardGeometry,
    pieces: Vec<Piece>,
    top_depth: f32,
}

impl Board {
    pub fn new(geometry: BoardGeometry) -> Self {
        let mut pieces = Vec::with_capacity(geometry.piece_count());
        for row in 0..geometry.rows {
            for col in 0..geometry.cols {
                let id = geometry.piece_id(col, row);
                let mut piece = Piece::new(id, col, row, geometry.cell_origin(col, row));
                piece.render.depth = DEPTH_BASE + id as f32;
                pieces.push(piece);
            }
        }
        let top_depth = DEPTH_BASE + pieces.len() as f32;
        Self {
            geometry,
            pieces,
            top_depth,
        }
    }

    pub fn geometry(&self) -> &BoardGeometry {
        &self.geometry
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, id: usize) -> Option<&Piece> {
        self.pieces.get(id)
    }

    pub fn piece_mut(&mut self, id: usize) -> Option<&mut Piece> {
        self.pieces.get_mut(id)
    }

    pub fn solved_ids(&self) -> Vec<usize> {
        self.pieces
            .iter()
            .filter(|piece| piece.solved)
            .map(|piece| piece.id)
            .collect()
    }

    /// Applies the full solved state at the piece's own target cell.
    /// Returns false (and changes nothing) for unknown or already
    /// solved pieces, so the placed notification can never double-fire.
    pub fn set_piece_solved(&mut self, id: usize) -> bool {
        let Some(piece) = self.pieces.get(id) else {
            return false;
        };
        let target = piece.target;
        self.place_solved_at(id, target)
    }

    /// Same as [`set_piece_solved`] but lands the piece on an explicit
    /// world position (template-guided placement).
    pub fn place_solved_at(&mut self, id: usize, pos: (f32, f32)) -> bool {
        let Some(piece) = self.pieces.get_mut(id) else {
            return false;
        };
        if piece.solved {
            return false;
        }
        piece.pos = pos;
        piece.rotation = 0.0;
        piece.solved = true;
        piece.render = RenderState {
            visible: true,
            interactive: false,
            depth: DEPTH_SOLVED,
            scroll_factor: piece.render.scroll_factor,
            opacity: 1.0,
            tint: TINT_NEUTRAL,
            layer: RenderLayer::Board,
        };
        true
    }

    pub fn enable_piece_interaction(&mut self, id: usize, enabled: bool) {
        if let Some(piece) = self.pieces.get_mut(id) {
            piece.render.interactive = enabled;
        }
    }

    pub fn set_piece_visible(&mut self, id: usize, visible: bool) {
        if let Some(piece) = self.pieces.get_mut(id) {
            piece.render.visible = visible;
        }
    }

    pub fn move_to_overlay_layer(&mut self, id: usize) {
        if let Some(piece) = self.pieces.get_mut(id) {
            piece.render.layer = RenderLayer::Overlay;
        }
    }

    pub fn restore_layer(&mut self, id: usize) {
        if let Some(piece) = self.pieces.get_mut(id) {
            piece.render.layer = RenderLayer::Board;
        }
    }

    /// Puts the piece above everything currently on its layer and
    /// returns the depth it had before.
    pub fn assign_top_depth(&mut self, id: usize) -> f32 {
        self.top_depth += 1.0;
        let top = self.top_depth;
        match self.pieces.get_mut(id) {
            Some(piece) => {
                let prev = piece.render.depth;
                piece.render.depth = top;
                prev
            }
            None => DEPTH_BASE,
        }
    }

    /// Workspace rect: the board expanded by the scatter margin on all
    /// sides. Doubles as the default drag clamp region.
    pub fn workspace_rect(&self) -> (f32, f32, f32, f32) {
        let margin = self.geometry.board_width().max(self.geometry.board_height())
            * SCATTER_MARGIN_RATIO;
        (
            self.geometry.origin.0 - margin,
            self.geometry.origin.1 - margin,
            self.geometry.board_width() + margin * 2.0,
            self.geometry.board_height() + margin * 2.0,
        )
    }

    /// Seeded scatter of every unsolved piece into the workspace
    /// margin, the usual level-start shuffle.
    pub fn scatter_unsolved(&mut self, seed: u32) {
        let (min_x, min_y, width, height) = self.workspace_rect();
        let max_x = min_x + width - self.geometry.piece_width;
        let max_y = min_y + height - self.geometry.piece_height;
        for id in 0..self.pieces.len() {
            if self.pieces[id].solved {
                continue;
            }
            let x = rand_range(seed, (id * 2) as u32, min_x, max_x.max(min_x));
            let y = rand_range(seed, (id * 2 + 1) as u32, min_y, max_y.max(min_y));
            let piece = &mut self.pieces[id];
            piece.pos = (x, y);
        }
    }
}
