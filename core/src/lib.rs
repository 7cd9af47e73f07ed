pub mod codec;
pub mod edge;
pub mod grid;
pub mod math;
pub mod outline;
pub mod snapshot;

pub use codec::{decode, encode};
pub use edge::{boundary_seed, EdgePlan, SideShapes, AXIS_HORIZONTAL, AXIS_VERTICAL};
pub use grid::{board_geometry, geometry_label, BoardGeometry};
pub use math::{angle_delta, angle_matches, normalize_angle, rand_range, rand_unit, splitmix32};
pub use outline::{outline_pad, piece_outline, tab_size, TabProfile};
pub use snapshot::{
    CropRect, PocketPieceRecord, PocketRecord, PocketSaveState, SessionRules, TemplateCellRecord,
    TemplateRecord, POCKET_CAPACITY, POCKET_COUNT, POCKET_SAVE_VERSION, SNAP_DISTANCE_DEFAULT,
};
