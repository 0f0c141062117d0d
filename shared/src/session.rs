use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ColorIndex, RegionId};

/// Region id -> chosen palette index. Unfilled regions are absent.
pub type FilledRegions = BTreeMap<RegionId, ColorIndex>;

/// Remote record of one user's progress on a project.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    #[serde(alias = "session_id")]
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub filled_regions: FilledRegions,
    #[serde(default)]
    pub completion_percent: u8,
    #[serde(default)]
    pub colored_image_url: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn new(id: String, project_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            project_id,
            filled_regions: FilledRegions::new(),
            completion_percent: 0,
            colored_image_url: None,
            is_completed: false,
            started_at: now,
            updated_at: None,
            completed_at: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SaveSessionRequest {
    pub filled_regions: FilledRegions,
    pub completion_percent: u8,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CompleteSessionRequest {
    pub session_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

/// Percentage of regions filled, floor-divided. Zero for an empty template.
pub fn completion_percent(filled: usize, regions: usize) -> u8 {
    if regions == 0 {
        return 0;
    }
    let percent = filled.min(regions) * 100 / regions;
    percent as u8
}
