use std::collections::HashMap;
use std::sync::Arc;

use numbrush_shared::CanvasTemplate;
use tokio::sync::RwLock;

use crate::logic::ProjectSessions;
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    /// Externally reachable origin, used to build `colored_image_url`.
    pub public_url: String,
    pub templates: Arc<RwLock<HashMap<String, Arc<CanvasTemplate>>>>,
    pub projects: Arc<RwLock<HashMap<String, Arc<RwLock<ProjectSessions>>>>>,
    /// session id -> project id, for every project loaded so far.
    pub session_index: Arc<RwLock<HashMap<String, String>>>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, public_url: impl Into<String>) -> Self {
        Self {
            storage,
            public_url: public_url.into(),
            templates: Arc::new(RwLock::new(HashMap::new())),
            projects: Arc::new(RwLock::new(HashMap::new())),
            session_index: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
