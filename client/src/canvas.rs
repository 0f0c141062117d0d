use std::sync::Arc;

use numbrush_shared::{
    CanvasTemplate, ColorIndex, FilledRegions, PaletteColor, Point, Region, RegionId,
};

use crate::error::IntegrityViolation;
use crate::fill::FillState;
use crate::hit_test::HitTester;
use crate::input::{exceeds_slop, Gesture, InputEvent};
use crate::progress;
use crate::viewport::{Size, ViewportTransform};

#[derive(Clone, Debug, PartialEq)]
pub enum CanvasResponse {
    Nothing,
    /// The transform changed; the renderer should redraw.
    ViewChanged,
    Filled {
        region_id: RegionId,
        color: ColorIndex,
        percent: u8,
    },
    /// A tap landed on background or a border.
    Missed,
    /// A tap hit a region but the canvas no longer accepts edits.
    Locked,
}

/// Render state for one region.
pub struct RegionPaint<'a> {
    pub region: &'a Region,
    /// `None` while unfilled; the renderer draws the placeholder and `label`.
    pub fill: Option<&'a PaletteColor>,
    pub label: Option<ColorIndex>,
}

/// Everything one open project needs on the interaction thread.
pub struct Canvas {
    template: Arc<CanvasTemplate>,
    viewport: ViewportTransform,
    viewport_size: Size,
    hit_tester: HitTester,
    fill: FillState,
    selected_color: ColorIndex,
    gesture: Gesture,
    locked: bool,
}

impl Canvas {
    pub fn new(template: Arc<CanvasTemplate>, viewport_size: Size) -> Self {
        let selected_color = template.palette.first().map(|color| color.index).unwrap_or(1);
        let mut canvas = Self {
            hit_tester: HitTester::new(template.clone()),
            fill: FillState::new(template.clone()),
            template,
            viewport: ViewportTransform::default(),
            viewport_size,
            selected_color,
            gesture: Gesture::Idle,
            locked: false,
        };
        canvas.fit();
        canvas
    }

    pub fn template(&self) -> &Arc<CanvasTemplate> {
        &self.template
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    pub fn fill_state(&self) -> &FillState {
        &self.fill
    }

    pub fn filled(&self) -> &FilledRegions {
        self.fill.filled()
    }

    pub fn percent(&self) -> u8 {
        progress::percent(&self.fill, &self.template)
    }

    pub fn selected_color(&self) -> ColorIndex {
        self.selected_color
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn select_color(&mut self, color: ColorIndex) -> Result<(), IntegrityViolation> {
        if self.template.color(color).is_none() {
            let violation = IntegrityViolation::UnknownColor(color);
            violation.report("rejected color selection");
            return Err(violation);
        }
        self.selected_color = color;
        Ok(())
    }

    pub fn handle(&mut self, event: InputEvent) -> CanvasResponse {
        match event {
            InputEvent::PointerDown { position } => {
                self.gesture = Gesture::Pressed {
                    origin: position,
                    last: position,
                    dragging: false,
                };
                CanvasResponse::Nothing
            }
            InputEvent::PointerMove { position } => self.pointer_move(position),
            InputEvent::PointerUp { position } => {
                let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
                match gesture {
                    Gesture::Pressed {
                        dragging: false, ..
                    } => self.tap(position),
                    _ => CanvasResponse::Nothing,
                }
            }
            InputEvent::PinchUpdate { factor, focal } => {
                if matches!(self.gesture, Gesture::Pressed { .. }) {
                    self.gesture = Gesture::Pinching;
                }
                if self.viewport.apply_zoom_around_focal(factor, focal) {
                    CanvasResponse::ViewChanged
                } else {
                    CanvasResponse::Nothing
                }
            }
            InputEvent::DoubleTap => {
                self.gesture = Gesture::Idle;
                self.fit_response()
            }
            InputEvent::Resize { size } => {
                self.viewport_size = size;
                self.fit_response()
            }
        }
    }

    /// Fills whatever region lies under the screen point with the selected color.
    pub fn tap(&mut self, screen: Point) -> CanvasResponse {
        let content = self.viewport.to_content(screen);
        let Some(region) = self.hit_tester.resolve(content) else {
            return CanvasResponse::Missed;
        };
        if self.locked {
            return CanvasResponse::Locked;
        }
        let region_id = region.id.clone();
        let color = self.selected_color;
        if self.fill.fill(&region_id, color).is_err() {
            return CanvasResponse::Missed;
        }
        tracing::trace!(region = %region_id, color, "filled region");
        CanvasResponse::Filled {
            region_id,
            color,
            percent: self.percent(),
        }
    }

    /// Fills a region by id, bypassing hit testing. Answers `Locked` without
    /// touching anything while the canvas is locked.
    pub fn fill_region(
        &mut self,
        region_id: &str,
        color: ColorIndex,
    ) -> Result<CanvasResponse, IntegrityViolation> {
        if self.locked {
            return Ok(CanvasResponse::Locked);
        }
        self.fill.fill(region_id, color)?;
        Ok(CanvasResponse::Filled {
            region_id: region_id.to_string(),
            color,
            percent: self.percent(),
        })
    }

    pub fn undo(&mut self) -> bool {
        !self.locked && self.fill.undo()
    }

    pub fn clear(&mut self) {
        if !self.locked {
            self.fill.clear();
        }
    }

    /// Seeds fills from a stored session; see [`FillState::load`].
    pub fn load(&mut self, snapshot: FilledRegions) -> usize {
        self.fill.load(snapshot)
    }

    pub fn paint_list(&self) -> impl Iterator<Item = RegionPaint<'_>> {
        let filled = self.fill.filled();
        self.template.regions.iter().map(move |region| {
            let fill = filled
                .get(&region.id)
                .and_then(|color| self.template.color(*color));
            RegionPaint {
                region,
                fill,
                label: fill.is_none().then_some(region.color_number),
            }
        })
    }

    fn pointer_move(&mut self, position: Point) -> CanvasResponse {
        let Gesture::Pressed {
            origin,
            last,
            dragging,
        } = &mut self.gesture
        else {
            return CanvasResponse::Nothing;
        };
        let from = if *dragging {
            *last
        } else if exceeds_slop(*origin, position) {
            *dragging = true;
            *origin
        } else {
            return CanvasResponse::Nothing;
        };
        *last = position;
        if self.viewport.apply_pan(position.x - from.x, position.y - from.y) {
            CanvasResponse::ViewChanged
        } else {
            CanvasResponse::Nothing
        }
    }

    fn fit(&mut self) -> bool {
        let content = Size::from(self.template.dimensions);
        self.viewport.fit_to_bounds(self.viewport_size, content)
    }

    fn fit_response(&mut self) -> CanvasResponse {
        if self.fit() {
            CanvasResponse::ViewChanged
        } else {
            CanvasResponse::Nothing
        }
    }
}
