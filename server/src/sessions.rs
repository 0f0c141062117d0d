use std::sync::Arc;

use chrono::Utc;
use numbrush_shared::{CanvasTemplate, SaveSessionRequest, SessionSnapshot};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;
use crate::logic::{self, ProjectSessions, SaveRejected};
use crate::state::AppState;
use crate::storage::StorageError;

pub fn new_session_id() -> String {
    Uuid::now_v7().to_string()
}

fn check_id(id: &str, what: &str) -> Result<(), ApiError> {
    if logic::is_valid_id(id) {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("{what} {id} not found")))
    }
}

pub async fn get_template(
    state: &AppState,
    project_id: &str,
) -> Result<Arc<CanvasTemplate>, ApiError> {
    check_id(project_id, "project")?;
    if let Some(template) = state.templates.read().await.get(project_id).cloned() {
        return Ok(template);
    }
    let template = state.storage.load_template(project_id).await?;
    if let Err(error) = template.validate() {
        tracing::error!(project = %project_id, %error, "stored template is invalid");
        return Err(ApiError::Internal(format!("project {project_id} is malformed")));
    }
    let template = Arc::new(template);
    let mut templates = state.templates.write().await;
    let entry = templates
        .entry(project_id.to_string())
        .or_insert_with(|| template.clone());
    Ok(entry.clone())
}

/// Loads the project's session file on first use. A missing file means no
/// sessions yet; an unreadable one is an error rather than a fresh start so
/// that the next flush cannot overwrite it.
pub async fn get_project_sessions(
    state: &AppState,
    project_id: &str,
) -> Result<Arc<RwLock<ProjectSessions>>, ApiError> {
    if let Some(project) = state.projects.read().await.get(project_id).cloned() {
        return Ok(project);
    }
    tracing::debug!(project = %project_id, "loading sessions");
    let project = match state.storage.load_sessions(project_id).await {
        Ok(data) => ProjectSessions::from_file_data(data),
        Err(StorageError::NotFound(_)) => ProjectSessions::default(),
        Err(error) => return Err(error.into()),
    };
    let session_ids = project
        .sessions
        .iter()
        .map(|session| session.id.clone())
        .collect::<Vec<_>>();
    let project = Arc::new(RwLock::new(project));

    let mut projects = state.projects.write().await;
    let entry = projects
        .entry(project_id.to_string())
        .or_insert_with(|| project.clone())
        .clone();
    drop(projects);

    let mut index = state.session_index.write().await;
    for session_id in session_ids {
        index.insert(session_id, project_id.to_string());
    }
    Ok(entry)
}

pub async fn open_session(state: &AppState, project_id: &str) -> Result<SessionSnapshot, ApiError> {
    get_template(state, project_id).await?;
    let project = get_project_sessions(state, project_id).await?;
    let (session, created) = {
        let mut project = project.write().await;
        logic::open_session(&mut project, project_id, new_session_id, Utc::now())
    };
    if created {
        tracing::info!(project = %project_id, session = %session.id, "session created");
        state
            .session_index
            .write()
            .await
            .insert(session.id.clone(), project_id.to_string());
    }
    Ok(session)
}

/// The index only covers projects loaded by this process, so a miss falls
/// back to searching storage. Loading the found project fills the index.
async fn locate(
    state: &AppState,
    session_id: &str,
) -> Result<(String, Arc<RwLock<ProjectSessions>>), ApiError> {
    check_id(session_id, "session")?;
    let indexed = state.session_index.read().await.get(session_id).cloned();
    let project_id = match indexed {
        Some(project_id) => project_id,
        None => {
            let Some(project_id) = state.storage.find_session(session_id).await? else {
                return Err(ApiError::NotFound(format!("session {session_id} not found")));
            };
            tracing::debug!(session = %session_id, project = %project_id, "session found in storage");
            project_id
        }
    };
    let project = get_project_sessions(state, &project_id).await?;
    Ok((project_id, project))
}

pub async fn save_session(
    state: &AppState,
    session_id: &str,
    request: SaveSessionRequest,
) -> Result<SessionSnapshot, ApiError> {
    let (project_id, project) = locate(state, session_id).await?;
    let template = get_template(state, &project_id).await?;
    let mut project = project.write().await;
    let session = project
        .get_mut(session_id)
        .ok_or_else(|| ApiError::NotFound(format!("session {session_id} not found")))?;
    let dropped = logic::apply_save(session, request, &template, Utc::now()).map_err(
        |SaveRejected::AlreadyCompleted| {
            ApiError::Conflict(format!("session {session_id} is already completed"))
        },
    )?;
    if dropped > 0 {
        tracing::warn!(session = %session_id, dropped, "dropped unknown fills");
    }
    let saved = session.clone();
    project.dirty = true;
    tracing::debug!(session = %session_id, percent = saved.completion_percent, "session saved");
    Ok(saved)
}

/// Completion is written through instead of waiting for the next flush. The
/// cache only takes the completed session once the write has succeeded, so a
/// failed write leaves the session open for further saves.
pub async fn complete_session(
    state: &AppState,
    session_id: &str,
) -> Result<SessionSnapshot, ApiError> {
    let (project_id, project) = locate(state, session_id).await?;
    let mut project = project.write().await;
    let mut completed = project
        .get_mut(session_id)
        .ok_or_else(|| ApiError::NotFound(format!("session {session_id} not found")))?
        .clone();
    logic::apply_complete(&mut completed, &state.public_url, Utc::now());
    let mut data = project.to_file_data();
    for session in data.sessions.iter_mut().filter(|s| s.id == session_id) {
        *session = completed.clone();
    }
    state.storage.save_sessions(&project_id, &data).await?;
    if let Some(session) = project.get_mut(session_id) {
        *session = completed.clone();
    }
    project.dirty = false;
    tracing::info!(
        project = %project_id,
        session = %session_id,
        percent = completed.completion_percent,
        "session completed"
    );
    Ok(completed)
}

pub async fn render_session(state: &AppState, session_id: &str) -> Result<String, ApiError> {
    let (project_id, project) = locate(state, session_id).await?;
    let template = get_template(state, &project_id).await?;
    let project = project.read().await;
    let session = project
        .sessions
        .iter()
        .find(|session| session.id == session_id)
        .ok_or_else(|| ApiError::NotFound(format!("session {session_id} not found")))?;
    Ok(logic::render_svg(&template, &session.filled_regions))
}

/// Writes every dirty project to storage. Projects that fail stay dirty for
/// the next round. Returns how many were written.
pub async fn flush_dirty(state: &AppState) -> usize {
    let projects = {
        let projects = state.projects.read().await;
        projects
            .iter()
            .map(|(project_id, project)| (project_id.clone(), project.clone()))
            .collect::<Vec<_>>()
    };
    let mut flushed = 0;
    for (project_id, project) in projects {
        let maybe_data = {
            let mut project = project.write().await;
            if !project.dirty {
                None
            } else {
                project.dirty = false;
                Some(project.to_file_data())
            }
        };
        let Some(data) = maybe_data else {
            continue;
        };
        match state.storage.save_sessions(&project_id, &data).await {
            Ok(()) => flushed += 1,
            Err(error) => {
                tracing::error!(project = %project_id, %error, "failed to flush sessions");
                project.write().await.dirty = true;
            }
        }
    }
    if flushed > 0 {
        tracing::debug!(flushed, "flushed dirty projects");
    }
    flushed
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use numbrush_shared::{Dimensions, FilledRegions, PaletteColor, Point, Region, SessionFileData};

    use super::*;
    use crate::storage::Storage;

    /// Serves one template and refuses every write.
    struct ReadOnlyStorage;

    #[async_trait]
    impl Storage for ReadOnlyStorage {
        async fn load_template(&self, _project_id: &str) -> Result<CanvasTemplate, StorageError> {
            Ok(CanvasTemplate {
                dimensions: Dimensions {
                    width: 10,
                    height: 10,
                },
                regions: vec![Region {
                    id: "r1".into(),
                    color_number: 1,
                    boundary: vec![
                        Point::new(0.0, 0.0),
                        Point::new(10.0, 0.0),
                        Point::new(10.0, 10.0),
                    ],
                    centroid: Point::new(6.0, 3.0),
                }],
                palette: vec![PaletteColor {
                    index: 1,
                    rgb: [255, 0, 0],
                    hex: "#ff0000".into(),
                }],
                metadata: None,
            })
        }

        async fn load_sessions(&self, project_id: &str) -> Result<SessionFileData, StorageError> {
            Err(StorageError::NotFound(format!("sessions of {project_id}")))
        }

        async fn save_sessions(
            &self,
            _project_id: &str,
            _data: &SessionFileData,
        ) -> Result<(), StorageError> {
            Err(StorageError::Io("disk full".into()))
        }

        async fn find_session(&self, _session_id: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
    }

    fn state() -> AppState {
        AppState::new(Arc::new(ReadOnlyStorage), "http://localhost:3000")
    }

    #[tokio::test]
    async fn failed_completion_leaves_the_session_open() {
        let state = state();
        let session = open_session(&state, "p1").await.unwrap();

        let failed = complete_session(&state, &session.id).await;
        assert!(matches!(failed, Err(ApiError::Internal(_))));

        let filled = FilledRegions::from([("r1".to_string(), 1)]);
        let saved = save_session(
            &state,
            &session.id,
            SaveSessionRequest {
                filled_regions: filled.clone(),
                completion_percent: 100,
            },
        )
        .await
        .unwrap();
        assert!(!saved.is_completed);
        assert!(saved.colored_image_url.is_none());
        assert_eq!(saved.filled_regions, filled);

        let reopened = open_session(&state, "p1").await.unwrap();
        assert_eq!(reopened.id, session.id);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let state = state();
        assert!(matches!(
            render_session(&state, "missing").await,
            Err(ApiError::NotFound(_))
        ));
    }
}
