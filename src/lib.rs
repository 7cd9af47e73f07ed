pub mod board;
pub mod events;
pub mod focus;
pub mod input;
pub mod interaction;
pub mod piece;
pub mod placement;
pub mod raster;
pub mod session;
pub mod shape;
pub mod stash;
pub mod storage;

pub use board::Board;
pub use events::{EventSink, EventSubscriber, GameEvent};
pub use focus::{FocusOverlay, Ghost, OverlayState, OverlayStyle};
pub use input::{BoundsRect, CaptureGesture};
pub use interaction::{DragOutcome, InteractionController};
pub use piece::{Piece, RenderLayer, RenderState, TINT_NEUTRAL};
pub use placement::{PlacementEngine, PlacementScope};
pub use raster::RasterError;
pub use session::GameSession;
pub use shape::{GeneratedLevel, PieceSpec, ShapeGenerator};
pub use stash::StashManager;
pub use storage::{KeyValueStore, MemoryStore, StoreError};
