use std::collections::VecDeque;
use std::sync::Arc;

use numbrush_shared::{CanvasTemplate, ColorIndex, FilledRegions};

use crate::error::IntegrityViolation;

pub const HISTORY_CAPACITY: usize = 50;

/// The user's region -> color assignment with snapshot based undo.
pub struct FillState {
    template: Arc<CanvasTemplate>,
    filled: FilledRegions,
    history: VecDeque<FilledRegions>,
}

impl FillState {
    pub fn new(template: Arc<CanvasTemplate>) -> Self {
        Self {
            template,
            filled: FilledRegions::new(),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn filled(&self) -> &FilledRegions {
        &self.filled
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Records the current mapping for undo, then assigns `color` to the
    /// region. Recoloring a filled region is recorded too.
    pub fn fill(&mut self, region_id: &str, color: ColorIndex) -> Result<(), IntegrityViolation> {
        if let Err(violation) = self.check(region_id, color) {
            violation.report("rejected fill");
            return Err(violation);
        }
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(self.filled.clone());
        self.filled.insert(region_id.to_string(), color);
        Ok(())
    }

    /// Restores the mapping from before the latest mutation. Returns false
    /// when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop_back() {
            Some(previous) => {
                self.filled = previous;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.filled.clear();
        self.history.clear();
    }

    /// Replaces the mapping with one hydrated from a session and forgets the
    /// undo history. Entries the template cannot resolve are dropped; the
    /// number dropped is returned.
    pub fn load(&mut self, snapshot: FilledRegions) -> usize {
        let total = snapshot.len();
        let filled = snapshot
            .into_iter()
            .filter(|(region_id, color)| match self.check(region_id, *color) {
                Ok(()) => true,
                Err(violation) => {
                    tracing::warn!(%violation, "dropping stored fill");
                    false
                }
            })
            .collect::<FilledRegions>();
        let dropped = total - filled.len();
        self.filled = filled;
        self.history.clear();
        dropped
    }

    fn check(&self, region_id: &str, color: ColorIndex) -> Result<(), IntegrityViolation> {
        if !self.template.contains_region(region_id) {
            return Err(IntegrityViolation::UnknownRegion(region_id.to_string()));
        }
        if self.template.color(color).is_none() {
            return Err(IntegrityViolation::UnknownColor(color));
        }
        Ok(())
    }
}
