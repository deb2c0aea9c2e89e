use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::notifications::{Notifier, PgNotifier};
use crate::services::storage::StorageService;

/// Shared handles injected into every handler. The pool is opened once in
/// `run` and closed there after shutdown; nothing here owns a global.
#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    storage: Option<StorageService>,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        storage: Option<StorageService>,
    ) -> Self {
        let notifier: Arc<dyn Notifier> = Arc::new(PgNotifier::new(db.clone()));
        Self::with_notifier(settings, db, redis, storage, notifier)
    }

    pub(crate) fn with_notifier(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        storage: Option<StorageService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, redis, storage, notifier }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn storage(&self) -> Option<&StorageService> {
        self.inner.storage.as_ref()
    }

    pub(crate) fn notifier(&self) -> &dyn Notifier {
        self.inner.notifier.as_ref()
    }
}
