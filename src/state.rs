use std::sync::Arc;

use sqlx::PgPool;

use crate::media::MediaStore;
use crate::notifications::NotificationQueue;

/// Handles shared by every request; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub notifications: NotificationQueue,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn new(pool: PgPool, notifications: NotificationQueue, media: Arc<dyn MediaStore>) -> Self {
        Self {
            pool,
            notifications,
            media,
        }
    }
}
