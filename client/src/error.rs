use std::fmt::{self, Display, Formatter};

use numbrush_shared::{ColorIndex, RegionId, TemplateError};

/// A fill, undo or color selection referenced something the template does not
/// have. This is a caller bug, never a user-facing condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    UnknownRegion(RegionId),
    UnknownColor(ColorIndex),
}

impl Display for IntegrityViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityViolation::UnknownRegion(id) => {
                write!(f, "region {id} is not part of the template")
            }
            IntegrityViolation::UnknownColor(index) => {
                write!(f, "color {index} is not part of the palette")
            }
        }
    }
}

impl IntegrityViolation {
    /// Logs the violation. Debug builds stop here; release builds carry on
    /// with the state untouched.
    pub(crate) fn report(&self, context: &str) {
        tracing::error!(violation = %self, "{context}");
        if cfg!(debug_assertions) {
            panic!("{context}: {self}");
        }
    }
}

impl std::error::Error for IntegrityViolation {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The request never produced a response (connect, timeout, reset).
    Network(String),
    Status { status: u16, message: String },
    Decode(String),
    /// The store client was set up with an unusable base url.
    Config(String),
    /// The task running the request died before producing a result.
    Interrupted(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Network(_) | StoreError::Interrupted(_) => true,
            StoreError::Status { status, .. } => *status >= 500 || *status == 429,
            StoreError::Decode(_) | StoreError::Config(_) => false,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Network(msg) => write!(f, "could not reach the store: {msg}"),
            StoreError::Status { status, message } => {
                write!(f, "store answered {status}: {message}")
            }
            StoreError::Decode(msg) => write!(f, "unreadable store response: {msg}"),
            StoreError::Config(msg) => write!(f, "store misconfigured: {msg}"),
            StoreError::Interrupted(msg) => write!(f, "store request interrupted: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Fatal to entering `Ready`; the caller may retry the whole load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateLoadError {
    Fetch(StoreError),
    Invalid(TemplateError),
    Session(StoreError),
}

impl Display for TemplateLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TemplateLoadError::Fetch(err) => write!(f, "failed to load project: {err}"),
            TemplateLoadError::Invalid(err) => write!(f, "project template is invalid: {err}"),
            TemplateLoadError::Session(err) => write!(f, "failed to load session: {err}"),
        }
    }
}

impl std::error::Error for TemplateLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateLoadError::Fetch(err) | TemplateLoadError::Session(err) => Some(err),
            TemplateLoadError::Invalid(err) => Some(err),
        }
    }
}

/// Save or complete did not go through. Local fill state is always kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSyncError {
    /// No session is open for editing (still loading, failed or completed).
    NotReady,
    /// Completion was requested while another request is in flight.
    Busy,
    Save(StoreError),
    Complete(StoreError),
}

impl SessionSyncError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionSyncError::NotReady => false,
            SessionSyncError::Busy => true,
            SessionSyncError::Save(err) | SessionSyncError::Complete(err) => err.is_retryable(),
        }
    }
}

impl Display for SessionSyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SessionSyncError::NotReady => write!(f, "no session is open for editing"),
            SessionSyncError::Busy => write!(f, "another save is still in progress"),
            SessionSyncError::Save(err) => write!(f, "failed to save progress: {err}"),
            SessionSyncError::Complete(err) => write!(f, "failed to complete project: {err}"),
        }
    }
}

impl std::error::Error for SessionSyncError {}
