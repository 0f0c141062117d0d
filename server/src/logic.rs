use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use numbrush_shared::{
    completion_percent, CanvasTemplate, FilledRegions, SaveSessionRequest, SessionFileData,
    SessionSnapshot,
};

/// In-memory sessions of one project, mirrored to one session file.
#[derive(Default)]
pub struct ProjectSessions {
    pub sessions: Vec<SessionSnapshot>,
    pub dirty: bool,
}

impl ProjectSessions {
    pub fn from_file_data(data: SessionFileData) -> Self {
        Self {
            sessions: data.sessions,
            dirty: false,
        }
    }

    pub fn to_file_data(&self) -> SessionFileData {
        SessionFileData {
            sessions: self.sessions.clone(),
        }
    }

    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut SessionSnapshot> {
        self.sessions
            .iter_mut()
            .find(|session| session.id == session_id)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SaveRejected {
    AlreadyCompleted,
}

/// Ids double as file names, so only a conservative alphabet is accepted.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_')
}

/// Returns the project's open session, creating one with `new_id` when every
/// existing session is completed. The flag is true when a session was created.
pub fn open_session(
    project: &mut ProjectSessions,
    project_id: &str,
    new_id: impl FnOnce() -> String,
    now: DateTime<Utc>,
) -> (SessionSnapshot, bool) {
    if let Some(open) = project.sessions.iter().find(|session| !session.is_completed) {
        return (open.clone(), false);
    }
    let session = SessionSnapshot::new(new_id(), project_id.to_string(), now);
    project.sessions.push(session.clone());
    project.dirty = true;
    (session, true)
}

/// Keeps only entries naming a template region and a palette color.
pub fn sanitize_filled(filled: FilledRegions, template: &CanvasTemplate) -> (FilledRegions, usize) {
    let total = filled.len();
    let kept = filled
        .into_iter()
        .filter(|(region_id, color)| {
            template.contains_region(region_id) && template.color(*color).is_some()
        })
        .collect::<FilledRegions>();
    let dropped = total - kept.len();
    (kept, dropped)
}

/// Replaces the session's mapping. The client's percent is ignored and
/// recomputed from what survives sanitizing.
pub fn apply_save(
    session: &mut SessionSnapshot,
    request: SaveSessionRequest,
    template: &CanvasTemplate,
    now: DateTime<Utc>,
) -> Result<usize, SaveRejected> {
    if session.is_completed {
        return Err(SaveRejected::AlreadyCompleted);
    }
    let (filled, dropped) = sanitize_filled(request.filled_regions, template);
    session.completion_percent = completion_percent(filled.len(), template.regions.len());
    session.filled_regions = filled;
    session.updated_at = Some(now);
    Ok(dropped)
}

/// Marks the session complete. Completing twice keeps the first timestamp.
pub fn apply_complete(session: &mut SessionSnapshot, public_url: &str, now: DateTime<Utc>) {
    if session.is_completed {
        return;
    }
    session.is_completed = true;
    session.completed_at = Some(now);
    session.updated_at = Some(now);
    session.colored_image_url = Some(render_url(public_url, &session.id));
}

pub fn render_url(public_url: &str, session_id: &str) -> String {
    format!(
        "{}/api/coloring/render/{session_id}",
        public_url.trim_end_matches('/')
    )
}

/// Draws the template with the session's fills. Unfilled regions are white
/// and carry their color number at the centroid.
pub fn render_svg(template: &CanvasTemplate, filled: &FilledRegions) -> String {
    let width = template.dimensions.width;
    let height = template.dimensions.height;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    for region in &template.regions {
        let fill = filled
            .get(&region.id)
            .and_then(|color| template.color(*color))
            .map(|color| color.hex.as_str());
        let points = region
            .boundary
            .iter()
            .map(|point| format!("{},{}", point.x, point.y))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = write!(
            svg,
            r##"<polygon points="{points}" fill="{}" stroke="#444444" stroke-width="0.5"/>"##,
            fill.unwrap_or("#ffffff")
        );
        if fill.is_none() {
            let _ = write!(
                svg,
                r##"<text x="{}" y="{}" font-size="8" text-anchor="middle" dominant-baseline="middle" fill="#888888">{}</text>"##,
                region.centroid.x, region.centroid.y, region.color_number
            );
        }
    }
    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use numbrush_shared::{Dimensions, PaletteColor, Point, Region};

    use super::*;

    fn template() -> CanvasTemplate {
        let regions = ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let x = i as f32 * 10.0;
                Region {
                    id: id.to_string(),
                    color_number: 1,
                    boundary: vec![
                        Point::new(x, 0.0),
                        Point::new(x + 10.0, 0.0),
                        Point::new(x + 10.0, 10.0),
                    ],
                    centroid: Point::new(x + 6.0, 3.0),
                }
            })
            .collect();
        CanvasTemplate {
            dimensions: Dimensions {
                width: 30,
                height: 10,
            },
            regions,
            palette: vec![PaletteColor {
                index: 1,
                rgb: [0, 128, 0],
                hex: "#008000".into(),
            }],
            metadata: None,
        }
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn filled(entries: &[(&str, u32)]) -> FilledRegions {
        entries
            .iter()
            .map(|(id, color)| (id.to_string(), *color))
            .collect()
    }

    #[test]
    fn ids_are_restricted() {
        assert!(is_valid_id("0190c2a4-7b7e-7cc0-b1a2-4f1d2e3c4b5a"));
        assert!(is_valid_id("sunset_2"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("../etc/passwd"));
        assert!(!is_valid_id("a b"));
        assert!(!is_valid_id(&"x".repeat(65)));
    }

    #[test]
    fn open_session_reuses_the_open_one() {
        let mut project = ProjectSessions::default();
        let (first, created) = open_session(&mut project, "p", || "s1".into(), at(0));
        assert!(created);
        assert!(project.dirty);
        project.dirty = false;

        let (again, created) = open_session(&mut project, "p", || "s2".into(), at(1));
        assert!(!created);
        assert_eq!(again, first);
        assert!(!project.dirty);
    }

    #[test]
    fn open_session_starts_fresh_after_completion() {
        let mut project = ProjectSessions::default();
        open_session(&mut project, "p", || "s1".into(), at(0));
        apply_complete(&mut project.sessions[0], "http://host", at(1));

        let (next, created) = open_session(&mut project, "p", || "s2".into(), at(2));
        assert!(created);
        assert_eq!(next.id, "s2");
        assert_eq!(project.sessions.len(), 2);
    }

    #[test]
    fn save_drops_unknown_entries_and_recomputes_percent() {
        let template = template();
        let mut session = SessionSnapshot::new("s".into(), "p".into(), at(0));
        let dropped = apply_save(
            &mut session,
            SaveSessionRequest {
                filled_regions: filled(&[("a", 1), ("b", 7), ("zz", 1)]),
                completion_percent: 100,
            },
            &template,
            at(5),
        )
        .unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(session.filled_regions, filled(&[("a", 1)]));
        assert_eq!(session.completion_percent, 33);
        assert_eq!(session.updated_at, Some(at(5)));
    }

    #[test]
    fn completed_sessions_reject_saves() {
        let template = template();
        let mut session = SessionSnapshot::new("s".into(), "p".into(), at(0));
        apply_complete(&mut session, "http://host/", at(1));
        let result = apply_save(
            &mut session,
            SaveSessionRequest {
                filled_regions: filled(&[("a", 1)]),
                completion_percent: 33,
            },
            &template,
            at(2),
        );
        assert_eq!(result, Err(SaveRejected::AlreadyCompleted));
        assert!(session.filled_regions.is_empty());
    }

    #[test]
    fn complete_sets_render_url_once() {
        let mut session = SessionSnapshot::new("s9".into(), "p".into(), at(0));
        apply_complete(&mut session, "https://colors.example/", at(3));
        assert!(session.is_completed);
        assert_eq!(session.completed_at, Some(at(3)));
        assert_eq!(
            session.colored_image_url.as_deref(),
            Some("https://colors.example/api/coloring/render/s9")
        );
        apply_complete(&mut session, "https://colors.example", at(9));
        assert_eq!(session.completed_at, Some(at(3)));
    }

    #[test]
    fn svg_fills_colored_regions_and_labels_the_rest() {
        let svg = render_svg(&template(), &filled(&[("b", 1)]));
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<polygon").count(), 3);
        assert_eq!(svg.matches(r##"fill="#008000""##).count(), 1);
        assert_eq!(svg.matches("<text").count(), 2);
        assert!(svg.contains(r#"points="10,0 20,0 20,10""#));
    }
}
