use numbrush_shared::Point;

use crate::viewport::Size;

/// Screen-space distance a pointer may travel and still count as a tap.
pub const TAP_SLOP: f32 = 8.0;

/// Gestures as delivered by the rendering layer, in screen coordinates.
///
/// Platforms that recognize double taps themselves deliver `DoubleTap` instead
/// of the second pointer sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    PointerDown { position: Point },
    PointerMove { position: Point },
    PointerUp { position: Point },
    PinchUpdate { factor: f32, focal: Point },
    DoubleTap,
    Resize { size: Size },
}

pub(crate) enum Gesture {
    Idle,
    Pressed {
        origin: Point,
        last: Point,
        dragging: bool,
    },
    /// A pinch took over the current pointer sequence.
    Pinching,
}

pub(crate) fn exceeds_slop(origin: Point, position: Point) -> bool {
    let dx = position.x - origin.x;
    let dy = position.y - origin.y;
    dx * dx + dy * dy > TAP_SLOP * TAP_SLOP
}
