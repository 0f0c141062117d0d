mod canvas;
mod error;
mod fill;
mod geometry;
mod input;
mod progress;
mod store;
mod sync;
mod viewport;

pub use canvas::{Canvas, CanvasResponse, RegionPaint};
pub use error::{IntegrityViolation, SessionSyncError, StoreError, TemplateLoadError};
pub use fill::{FillState, HISTORY_CAPACITY};
pub use geometry::{point_in_polygon, Bounds};
pub use hit_test::HitTester;
pub use input::{InputEvent, TAP_SLOP};
pub use store::{HttpStore, NoToken, ProjectStore, StaticToken, StoreConfig, TokenProvider};
pub use sync::{SessionSync, SyncEvent, SyncPhase};
pub use viewport::{Size, ViewportTransform, FIT_PADDING, MAX_SCALE, MIN_SCALE};

pub use numbrush_shared as shared;
