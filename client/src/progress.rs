use numbrush_shared::{completion_percent, CanvasTemplate};

use crate::fill::FillState;

/// Completion in whole percent, floor-divided; 0 for a template without regions.
pub fn percent(fill_state: &FillState, template: &CanvasTemplate) -> u8 {
    completion_percent(fill_state.filled().len(), template.regions.len())
}
