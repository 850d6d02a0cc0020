//! Bundled repositories and the lazily-initialized storage handle.

use tokio::sync::OnceCell;
use tracing::info;

use crate::cert_event_repo::CertEventRepository;
use crate::error::Result;
use crate::sqlite_pool::SqlitePoolManager;
use crate::user_repo::UserRepository;

/// Both repositories over one shared pool.
#[derive(Clone)]
pub struct Storage {
    pub events: CertEventRepository,
    pub users: UserRepository,
}

impl Storage {
    /// Connects to `database_url` and creates missing tables.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        let events = CertEventRepository::with_pool(pool_manager.clone()).await?;
        let users = UserRepository::with_pool(pool_manager).await?;
        Ok(Self { events, users })
    }
}

/// Process-lifetime storage handle, connected on first use.
///
/// [`get`](Self::get) connects once and hands out the same [`Storage`] afterwards; concurrent
/// first calls wait for the single connection attempt. A failed attempt leaves the handle
/// empty so the next call retries.
pub struct StorageHandle {
    database_url: String,
    cell: OnceCell<Storage>,
}

impl StorageHandle {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<&Storage> {
        self.cell
            .get_or_try_init(|| async {
                info!(database_url = %self.database_url, "Connecting storage");
                Storage::connect(&self.database_url).await
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}
