//! Application state management

use crate::auth::password::PasswordError;
use crate::auth::service::AuthService;
use crate::email::Mailer;
use exploria_core::AppConfig;
use exploria_store::AccountRepository;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use utoipa::ToSchema;

/// Per-endpoint request statistics
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct EndpointStats {
    pub count: u64,
    pub total_latency_us: u64,
    /// Responses by status code
    pub statuses: BTreeMap<u16, u64>,
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Credential and session flows
    pub auth: AuthService,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Keyed by normalized endpoint path
    pub endpoint_stats: RwLock<BTreeMap<String, EndpointStats>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repository: Arc<dyn AccountRepository>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, PasswordError> {
        let auth = AuthService::new(&config, repository, mailer)?;
        Ok(Self {
            config,
            auth,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            endpoint_stats: RwLock::new(BTreeMap::new()),
        })
    }

    /// Record one finished request
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        let mut stats = self.endpoint_stats.write().await;
        let entry = stats.entry(endpoint).or_default();
        entry.count += 1;
        entry.total_latency_us += latency_us;
        *entry.statuses.entry(status).or_default() += 1;
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
