use std::collections::VecDeque;
use std::sync::Arc;

use numbrush_shared::{CanvasTemplate, FilledRegions, SaveSessionRequest, SessionSnapshot};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::canvas::{Canvas, CanvasResponse};
use crate::error::{SessionSyncError, StoreError, TemplateLoadError};
use crate::input::InputEvent;
use crate::store::ProjectStore;
use crate::viewport::Size;

#[derive(Clone, Debug, PartialEq)]
pub enum SyncPhase {
    Loading,
    Ready,
    Saving,
    Completing,
    Completed,
    Failed(TemplateLoadError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    /// The canvas is open. `dropped` counts stored fills the template rejected.
    Ready { percent: u8, dropped: usize },
    LoadFailed(TemplateLoadError),
    Saved { percent: u8 },
    SaveFailed(SessionSyncError),
    Completed(SessionSnapshot),
    CompleteFailed(SessionSyncError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SaveMode {
    Explicit,
    /// Autosave: failures are logged, never reported.
    Silent,
}

type CompleteResult = Result<SessionSnapshot, (Option<SessionSnapshot>, SessionSyncError)>;

enum Completion {
    Loaded {
        generation: u64,
        result: Result<(CanvasTemplate, SessionSnapshot), TemplateLoadError>,
    },
    Saved {
        mode: SaveMode,
        sent: FilledRegions,
        result: Result<SessionSnapshot, StoreError>,
    },
    Completed {
        sent: FilledRegions,
        result: CompleteResult,
    },
}

/// Drives one open project: loads it, then reconciles the local fill state
/// with the store.
///
/// Store calls run as tokio tasks and report back over a channel; nothing
/// changes until the owner applies them with [`SessionSync::next_event`] or
/// [`SessionSync::poll_events`]. At most one save or complete is in flight;
/// saves requested meanwhile collapse into a single follow-up that carries
/// the fill state current when it is sent.
pub struct SessionSync {
    store: Arc<dyn ProjectStore>,
    project_id: String,
    viewport_size: Size,
    phase: SyncPhase,
    canvas: Option<Canvas>,
    session: Option<SessionSnapshot>,
    generation: u64,
    load_task: Option<JoinHandle<()>>,
    in_flight: Option<JoinHandle<()>>,
    queued_save: Option<SaveMode>,
    /// Applied but not yet handed out.
    pending: VecDeque<SyncEvent>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl SessionSync {
    /// Starts loading `project_id`. Must be called within a tokio runtime.
    pub fn open(
        store: Arc<dyn ProjectStore>,
        project_id: impl Into<String>,
        viewport_size: Size,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sync = Self {
            store,
            project_id: project_id.into(),
            viewport_size,
            phase: SyncPhase::Loading,
            canvas: None,
            session: None,
            generation: 0,
            load_task: None,
            in_flight: None,
            queued_save: None,
            pending: VecDeque::new(),
            tx,
            rx,
        };
        sync.start_load();
        sync
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn phase(&self) -> &SyncPhase {
        &self.phase
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn canvas_mut(&mut self) -> Option<&mut Canvas> {
        self.canvas.as_mut()
    }

    /// Last snapshot the store acknowledged.
    pub fn session(&self) -> Option<&SessionSnapshot> {
        self.session.as_ref()
    }

    pub fn handle_input(&mut self, event: InputEvent) -> CanvasResponse {
        match self.canvas.as_mut() {
            Some(canvas) => canvas.handle(event),
            None => {
                if let InputEvent::Resize { size } = event {
                    self.viewport_size = size;
                }
                CanvasResponse::Nothing
            }
        }
    }

    /// Re-enters `Loading` after a failed load. Returns false in any other phase.
    pub fn retry(&mut self) -> bool {
        if !matches!(self.phase, SyncPhase::Failed(_)) {
            return false;
        }
        self.start_load();
        true
    }

    pub fn save(&mut self) -> Result<(), SessionSyncError> {
        self.request_save(SaveMode::Explicit)
    }

    /// Best-effort save for backgrounding. Never reports failure.
    pub fn autosave(&mut self) {
        if let Err(err) = self.request_save(SaveMode::Silent) {
            tracing::debug!(project = %self.project_id, %err, "autosave skipped");
        }
    }

    /// Saves, then marks the session complete. Only allowed from `Ready`.
    pub fn complete(&mut self) -> Result<(), SessionSyncError> {
        match self.phase {
            SyncPhase::Ready => {}
            SyncPhase::Saving | SyncPhase::Completing => return Err(SessionSyncError::Busy),
            _ => return Err(SessionSyncError::NotReady),
        }
        let Some((session_id, request)) = self.save_request() else {
            return Err(SessionSyncError::NotReady);
        };
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.set_locked(true);
        }
        self.phase = SyncPhase::Completing;
        tracing::debug!(session = %session_id, percent = request.completion_percent, "completing session");

        let store = self.store.clone();
        let tx = self.tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let sent = request.filled_regions.clone();
            let result = match store.save_session(&session_id, &request).await {
                Ok(saved) => store
                    .complete_session(&session_id)
                    .await
                    .map_err(|err| (Some(saved), SessionSyncError::Complete(err))),
                Err(err) => Err((None, SessionSyncError::Save(err))),
            };
            let _ = tx.send(Completion::Completed { sent, result });
        }));
        Ok(())
    }

    /// Waits for the next outstanding store call and applies it. Returns
    /// `None` once nothing is outstanding. A store task that dies without
    /// reporting (a panicking store) surfaces as an `Interrupted` failure.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.load_task.is_none() && self.in_flight.is_none() {
                return None;
            }
            // A task sends its completion before it finishes, so the channel
            // is drained first.
            tokio::select! {
                biased;
                Some(completion) = self.rx.recv() => self.apply(completion),
                reason = join(&mut self.load_task) => {
                    self.drain_completions();
                    if self.load_task.is_some() {
                        self.load_lost(reason);
                    }
                }
                reason = join(&mut self.in_flight) => {
                    self.drain_completions();
                    if self.in_flight.is_some() {
                        self.mutation_lost(reason);
                    }
                }
            }
        }
    }

    /// Applies every store call that already finished, without waiting.
    pub fn poll_events(&mut self) -> Vec<SyncEvent> {
        let load_ended = self.load_task.as_ref().is_some_and(JoinHandle::is_finished);
        let mutation_ended = self.in_flight.as_ref().is_some_and(JoinHandle::is_finished);
        self.drain_completions();
        if load_ended && self.load_task.is_some() {
            self.load_lost(TASK_VANISHED.to_string());
        }
        if mutation_ended && self.in_flight.is_some() {
            self.mutation_lost(TASK_VANISHED.to_string());
        }
        self.pending.drain(..).collect()
    }

    /// Tears the session down: an outstanding load is cancelled, and unsaved
    /// progress gets exactly one autosave attempt that outlives `self`. The
    /// autosave waits for any request already in flight so the store sees
    /// writes in order.
    pub fn close(mut self) -> Option<JoinHandle<()>> {
        if let Some(load) = self.load_task.take() {
            load.abort();
            tracing::debug!(project = %self.project_id, "cancelled project load");
        }
        if !matches!(self.phase, SyncPhase::Ready | SyncPhase::Saving) {
            return None;
        }
        let (session_id, request) = self.save_request()?;
        let previous = self.in_flight.take();
        let synced = self
            .session
            .as_ref()
            .is_some_and(|session| session.filled_regions == request.filled_regions);
        if previous.is_none() && synced {
            return None;
        }

        let store = self.store.clone();
        Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            match store.save_session(&session_id, &request).await {
                Ok(_) => tracing::debug!(session = %session_id, "saved on close"),
                Err(err) => tracing::debug!(session = %session_id, %err, "autosave on close failed"),
            }
        }))
    }

    fn start_load(&mut self) {
        self.generation += 1;
        self.phase = SyncPhase::Loading;
        let generation = self.generation;
        let store = self.store.clone();
        let project_id = self.project_id.clone();
        let tx = self.tx.clone();
        tracing::debug!(project = %project_id, generation, "loading project");
        self.load_task = Some(tokio::spawn(async move {
            let result = load_project(store.as_ref(), &project_id).await;
            let _ = tx.send(Completion::Loaded { generation, result });
        }));
    }

    fn request_save(&mut self, mode: SaveMode) -> Result<(), SessionSyncError> {
        match self.phase {
            SyncPhase::Ready => {
                self.start_save(mode);
                Ok(())
            }
            SyncPhase::Saving | SyncPhase::Completing => {
                self.queued_save = match self.queued_save {
                    Some(SaveMode::Explicit) => Some(SaveMode::Explicit),
                    _ => Some(mode),
                };
                tracing::trace!(project = %self.project_id, ?mode, "save coalesced");
                Ok(())
            }
            _ => Err(SessionSyncError::NotReady),
        }
    }

    fn start_save(&mut self, mode: SaveMode) {
        let Some((session_id, request)) = self.save_request() else {
            return;
        };
        self.phase = SyncPhase::Saving;
        tracing::debug!(session = %session_id, percent = request.completion_percent, ?mode, "saving session");

        let store = self.store.clone();
        let tx = self.tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = store.save_session(&session_id, &request).await;
            let _ = tx.send(Completion::Saved {
                mode,
                sent: request.filled_regions,
                result,
            });
        }));
    }

    fn save_request(&self) -> Option<(String, SaveSessionRequest)> {
        let session = self.session.as_ref()?;
        let canvas = self.canvas.as_ref()?;
        Some((
            session.id.clone(),
            SaveSessionRequest {
                filled_regions: canvas.filled().clone(),
                completion_percent: canvas.percent(),
            },
        ))
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Loaded { generation, result } => {
                if generation != self.generation {
                    tracing::debug!(generation, "discarding stale project load");
                    return;
                }
                self.load_task = None;
                self.finish_load(result);
            }
            Completion::Saved { mode, sent, result } => {
                self.in_flight = None;
                self.phase = SyncPhase::Ready;
                let persisted = result.is_ok();
                match result {
                    Ok(snapshot) => {
                        let percent = snapshot.completion_percent;
                        self.session = Some(snapshot);
                        if mode == SaveMode::Explicit {
                            self.pending.push_back(SyncEvent::Saved { percent });
                        }
                    }
                    Err(err) => {
                        if mode == SaveMode::Explicit {
                            tracing::warn!(project = %self.project_id, %err, "save failed");
                            self.pending
                                .push_back(SyncEvent::SaveFailed(SessionSyncError::Save(err)));
                        } else {
                            tracing::debug!(project = %self.project_id, %err, "autosave failed");
                        }
                    }
                }
                let satisfied = self.run_queued_save(persisted.then_some(&sent));
                if mode == SaveMode::Silent && satisfied == Some(SaveMode::Explicit) {
                    self.report_satisfied_save();
                }
            }
            Completion::Completed { sent, result } => {
                self.in_flight = None;
                match result {
                    Ok(snapshot) => {
                        tracing::debug!(session = %snapshot.id, "session completed");
                        self.phase = SyncPhase::Completed;
                        self.queued_save = None;
                        self.session = Some(snapshot.clone());
                        self.pending.push_back(SyncEvent::Completed(snapshot));
                    }
                    Err((saved, err)) => {
                        tracing::warn!(project = %self.project_id, %err, "complete failed");
                        let persisted = saved.is_some();
                        if let Some(saved) = saved {
                            self.session = Some(saved);
                        }
                        if let Some(canvas) = self.canvas.as_mut() {
                            canvas.set_locked(false);
                        }
                        self.phase = SyncPhase::Ready;
                        self.pending.push_back(SyncEvent::CompleteFailed(err));
                        let satisfied = self.run_queued_save(persisted.then_some(&sent));
                        if satisfied == Some(SaveMode::Explicit) {
                            self.report_satisfied_save();
                        }
                    }
                }
            }
        }
    }

    fn drain_completions(&mut self) {
        while let Ok(completion) = self.rx.try_recv() {
            self.apply(completion);
        }
    }

    /// An explicit save coalesced onto a request that reported nothing
    /// still gets its answer.
    fn report_satisfied_save(&mut self) {
        if let Some(session) = self.session.as_ref() {
            self.pending.push_back(SyncEvent::Saved {
                percent: session.completion_percent,
            });
        }
    }

    fn load_lost(&mut self, reason: String) {
        self.load_task = None;
        tracing::error!(project = %self.project_id, %reason, "project load task died");
        let err = TemplateLoadError::Fetch(StoreError::Interrupted(reason));
        self.phase = SyncPhase::Failed(err.clone());
        self.pending.push_back(SyncEvent::LoadFailed(err));
    }

    fn mutation_lost(&mut self, reason: String) {
        self.in_flight = None;
        tracing::error!(project = %self.project_id, %reason, "store task died");
        let err = StoreError::Interrupted(reason);
        let event = if self.phase == SyncPhase::Completing {
            if let Some(canvas) = self.canvas.as_mut() {
                canvas.set_locked(false);
            }
            SyncEvent::CompleteFailed(SessionSyncError::Complete(err))
        } else {
            SyncEvent::SaveFailed(SessionSyncError::Save(err))
        };
        self.phase = SyncPhase::Ready;
        self.pending.push_back(event);
        self.run_queued_save(None);
    }

    fn finish_load(
        &mut self,
        result: Result<(CanvasTemplate, SessionSnapshot), TemplateLoadError>,
    ) {
        let event = match result {
            Ok((template, session)) => {
                let mut canvas = Canvas::new(Arc::new(template), self.viewport_size);
                let dropped = canvas.load(session.filled_regions.clone());
                let percent = canvas.percent();
                tracing::debug!(
                    project = %self.project_id,
                    session = %session.id,
                    percent,
                    dropped,
                    "project ready"
                );
                let event = if session.is_completed {
                    canvas.set_locked(true);
                    self.phase = SyncPhase::Completed;
                    SyncEvent::Completed(session.clone())
                } else {
                    self.phase = SyncPhase::Ready;
                    SyncEvent::Ready { percent, dropped }
                };
                self.canvas = Some(canvas);
                self.session = Some(session);
                event
            }
            Err(err) => {
                tracing::warn!(project = %self.project_id, %err, "project failed to load");
                self.phase = SyncPhase::Failed(err.clone());
                SyncEvent::LoadFailed(err)
            }
        };
        self.pending.push_back(event);
    }

    /// Sends the coalesced follow-up, unless the request that just finished
    /// already persisted exactly the current state. Returns the mode of a
    /// follow-up that was skipped for that reason.
    fn run_queued_save(&mut self, persisted: Option<&FilledRegions>) -> Option<SaveMode> {
        let mode = self.queued_save.take()?;
        let current = self.canvas.as_ref().map(Canvas::filled);
        if persisted.is_some() && persisted == current {
            tracing::trace!(project = %self.project_id, "coalesced save already satisfied");
            return Some(mode);
        }
        self.start_save(mode);
        None
    }
}

impl Drop for SessionSync {
    fn drop(&mut self) {
        if let Some(load) = self.load_task.take() {
            load.abort();
        }
    }
}

const TASK_VANISHED: &str = "store task ended without reporting";

async fn join(task: &mut Option<JoinHandle<()>>) -> String {
    match task {
        Some(handle) => match handle.await {
            Ok(()) => TASK_VANISHED.to_string(),
            Err(err) => err.to_string(),
        },
        None => std::future::pending().await,
    }
}

async fn load_project(
    store: &dyn ProjectStore,
    project_id: &str,
) -> Result<(CanvasTemplate, SessionSnapshot), TemplateLoadError> {
    let template = store
        .fetch_project(project_id)
        .await
        .map_err(TemplateLoadError::Fetch)?;
    template.validate().map_err(TemplateLoadError::Invalid)?;
    let session = store
        .fetch_or_create_session(project_id)
        .await
        .map_err(TemplateLoadError::Session)?;
    Ok((template, session))
}
