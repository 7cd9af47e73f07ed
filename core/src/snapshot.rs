use rkyv::{Archive, Deserialize, Serialize};

pub const POCKET_SAVE_VERSION: u32 = 1;
pub const POCKET_COUNT: usize = 3;
pub const POCKET_CAPACITY: usize = 16;

pub const SNAP_DISTANCE_DEFAULT: f32 = 30.0;
pub const ROTATION_STEP_DEG: f32 = 90.0;

/// Placement tuning for one session. Distances are in logical board
/// units; the rotation gate for snapping is exact zero, only the step
/// applied by the rotate gesture is configurable here.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionRules {
    pub snap_distance: f32,
    pub rotation_step_deg: f32,
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            snap_distance: SNAP_DISTANCE_DEFAULT,
            rotation_step_deg: ROTATION_STEP_DEG,
        }
    }
}

/// World-space rectangle a template was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub struct PocketPieceRecord {
    pub piece_id: u32,
    pub angle: f32,
    pub slot_index: u8,
    /// Pose the piece had when it entered the pocket; retrieval falls
    /// back to a randomized spot when a record arrives without one.
    pub last_world_pos: Option<(f32, f32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct TemplateCellRecord {
    pub piece_id: u32,
    pub col: u32,
    pub row: u32,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub layout: Vec<TemplateCellRecord>,
    pub captured_at: u64,
    pub crop: CropRect,
    pub solved_ids: Vec<u32>,
}

impl TemplateRecord {
    pub fn cell_for(&self, piece_id: u32) -> Option<(u32, u32)> {
        self.layout
            .iter()
            .find(|cell| cell.piece_id == piece_id)
            .map(|cell| (cell.col, cell.row))
    }

    pub fn contains_piece(&self, piece_id: u32) -> bool {
        self.layout.iter().any(|cell| cell.piece_id == piece_id)
    }

    pub fn is_solved(&self, piece_id: u32) -> bool {
        self.solved_ids.contains(&piece_id)
    }

    pub fn unsolved_count(&self) -> usize {
        self.layout
            .iter()
            .filter(|cell| !self.solved_ids.contains(&cell.piece_id))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct PocketRecord {
    pub id: u8,
    pub pieces: Vec<PocketPieceRecord>,
    pub template: Option<TemplateRecord>,
}

impl PocketRecord {
    pub fn empty(id: u8) -> Self {
        Self {
            id,
            pieces: Vec::new(),
            template: None,
        }
    }

    pub fn holds(&self, piece_id: u32) -> bool {
        self.pieces.iter().any(|entry| entry.piece_id == piece_id)
    }

    pub fn is_full(&self) -> bool {
        self.pieces.len() >= POCKET_CAPACITY
    }

    /// Lowest slot index not taken by any current entry.
    pub fn free_slot(&self) -> Option<u8> {
        (0..POCKET_CAPACITY as u8).find(|slot| {
            !self.pieces.iter().any(|entry| entry.slot_index == *slot)
        })
    }
}

/// The persisted unit: always exactly [`POCKET_COUNT`] pockets, stored
/// under a per-level key.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct PocketSaveState {
    pub version: u32,
    pub pockets: Vec<PocketRecord>,
}

impl PocketSaveState {
    pub fn empty() -> Self {
        Self {
            version: POCKET_SAVE_VERSION,
            pockets: (0..POCKET_COUNT as u8).map(PocketRecord::empty).collect(),
        }
    }
}

impl Default for PocketSaveState {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_slot_skips_taken_indices() {
        let mut pocket = PocketRecord::empty(0);
        for slot in [0u8, 1, 3] {
            pocket.pieces.push(PocketPieceRecord {
                piece_id: slot as u32 + 10,
                angle: 0.0,
                slot_index: slot,
                last_world_pos: None,
            });
        }
        assert_eq!(pocket.free_slot(), Some(2));
    }

    #[test]
    fn full_pocket_has_no_free_slot() {
        let mut pocket = PocketRecord::empty(1);
        for slot in 0..POCKET_CAPACITY as u8 {
            pocket.pieces.push(PocketPieceRecord {
                piece_id: slot as u32,
                angle: 0.0,
                slot_index: slot,
                last_world_pos: None,
            });
        }
        assert!(pocket.is_full());
        assert_eq!(pocket.free_slot(), None);
    }

    #[test]
    fn template_unsolved_count_tracks_solved_ids() {
        let template = TemplateRecord {
            layout: vec![
                TemplateCellRecord { piece_id: 4, col: 0, row: 0 },
                TemplateCellRecord { piece_id: 5, col: 1, row: 0 },
                TemplateCellRecord { piece_id: 8, col: 0, row: 1 },
            ],
            captured_at: 0,
            crop: CropRect { x: 0.0, y: 0.0, width: 100.0, height: 100.0 },
            solved_ids: vec![5],
        };
        assert_eq!(template.unsolved_count(), 2);
        assert_eq!(template.cell_for(8), Some((0, 1)));
        assert_eq!(template.cell_for(9), None);
    }

    #[test]
    fn save_state_round_trips_through_codec() {
        let mut state = PocketSaveState::empty();
        state.pockets[1].pieces.push(PocketPieceRecord {
            piece_id: 7,
            angle: 90.0,
            slot_index: 0,
            last_world_pos: Some((123.0, 45.0)),
        });
        let bytes = crate::codec::encode(&state).expect("encode");
        let decoded = crate::codec::decode::<PocketSaveState>(&bytes).expect("decode");
        assert_eq!(decoded, state);
    }
}
