use serde::{Deserialize, Serialize};

mod session;
mod session_format;
mod template;

pub use session::{
    completion_percent, CompleteSessionRequest, ErrorBody, FilledRegions, SaveSessionRequest,
    SessionSnapshot,
};
pub use session_format::{
    decode_session_file, encode_session_file, SessionFileData, SessionFileDecodeError,
    SessionFileEncodeError, SESSION_FILE_MAGIC, SESSION_FILE_VERSION,
};
pub use template::{
    CanvasTemplate, Dimensions, PaletteColor, Region, TemplateError, TemplateMetadata,
};

pub type RegionId = String;
pub type ColorIndex = u32;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}
