use crate::email::{FileOutbox, Mailer};
use kns_core::paths;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    /// Base URL used when building confirmation links for emails.
    pub base_url: String,
    pub mailer: Arc<dyn Mailer>,
    /// Serializes mutating handlers so two load-modify-write cycles on a
    /// store file cannot interleave; of two concurrent decisions the
    /// loser fails with AlreadyProcessed.
    pub write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(root: PathBuf) -> Self {
        let outbox = FileOutbox::new(paths::outbox_dir(&root));
        Self::with_mailer(root, Arc::new(outbox))
    }

    pub fn with_mailer(root: PathBuf, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            root,
            base_url: "http://localhost:8611".to_string(),
            mailer,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Builder: set the public base URL for email links.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        self.base_url = base_url;
        self
    }
}
