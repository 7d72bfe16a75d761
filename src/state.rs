//! Shared handles passed to every handler.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::email::{EmailSender, HttpEmailSender, LogEmailSender};
use crate::store::{MemoryStore, PgStore, PortfolioStore, TemplateStore, UserStore, ViewStore};
use crate::upload::{BlobUploader, CloudinaryUploader, PlaceholderUploader};

#[derive(Clone)]
pub struct AppState {
    pub templates: Arc<dyn TemplateStore>,
    pub portfolios: Arc<dyn PortfolioStore>,
    pub users: Arc<dyn UserStore>,
    pub views: Arc<dyn ViewStore>,
    pub uploader: Arc<dyn BlobUploader>,
    pub mailer: Arc<dyn EmailSender>,
    pub config: Arc<AppConfig>,
    /// Present only when running against Postgres; used by health checks.
    pub db: Option<PgPool>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire one store implementation into every store seam and pick the
    /// upload and email collaborators from configuration.
    pub fn new<S>(store: Arc<S>, config: AppConfig, db: Option<PgPool>) -> Self
    where
        S: TemplateStore + PortfolioStore + UserStore + ViewStore + 'static,
    {
        let uploader: Arc<dyn BlobUploader> = match config.cloudinary.clone() {
            Some(cloudinary) => Arc::new(CloudinaryUploader::new(cloudinary)),
            None => {
                tracing::warn!("Cloudinary credentials not set, uploads return placeholders");
                Arc::new(PlaceholderUploader)
            }
        };
        let mailer: Arc<dyn EmailSender> = match config.email.clone() {
            Some(email) => Arc::new(HttpEmailSender::new(email)),
            None => {
                tracing::warn!("Email API not configured, messages will only be logged");
                Arc::new(LogEmailSender)
            }
        };

        Self {
            templates: store.clone(),
            portfolios: store.clone(),
            users: store.clone(),
            views: store,
            uploader,
            mailer,
            config: Arc::new(config),
            db,
            started_at: Instant::now(),
        }
    }

    pub fn postgres(pool: PgPool, config: AppConfig) -> Self {
        Self::new(Arc::new(PgStore::new(pool.clone())), config, Some(pool))
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config, None)
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn BlobUploader>) -> Self {
        self.uploader = uploader;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn EmailSender>) -> Self {
        self.mailer = mailer;
        self
    }
}
