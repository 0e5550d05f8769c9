//! Periodically refreshed catalog cache
//!
//! One background task per cache downloads both catalogs, publishes them as a
//! single immutable [`CatalogSnapshot`] and sleeps until the next wake-up.
//! Readers go through a `watch` channel, so they either see the previous
//! snapshot or the new one, never a mix of two refresh cycles.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    CatalogSnapshot, CatalogSource, FetchError, LookupError, LookupResult, ModelMetadataEntry,
    OfficialList, OfficialListEntry,
};
use crate::config::CatalogConfig;

/// Result of a single refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Current data is populated and younger than the maximum age
    Fresh,
    /// Both catalogs were downloaded and a new snapshot was published
    Published,
    /// A download failed; the previous snapshot was kept
    Failed,
    /// A manual refresh was requested while the background loop owns the snapshot
    Skipped,
}

/// Refresh loop state
enum LoopState {
    Stopped,
    Running {
        handle: JoinHandle<()>,
        stop: Arc<StopSignal>,
    },
}

/// Stop request for one run of the refresh loop
#[derive(Default)]
struct StopSignal {
    requested: AtomicBool,
    wake: Notify,
}

impl StopSignal {
    fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

struct Shared {
    config: CatalogConfig,
    source: Arc<dyn CatalogSource>,
    snapshot: watch::Sender<Arc<CatalogSnapshot>>,
    published: AtomicU64,
}

/// In-memory copy of the Smart Data Models catalogs
///
/// Created once by the composition root and shared behind an `Arc` with
/// everything that performs lookups.
pub struct CatalogCache {
    shared: Arc<Shared>,
    state: Mutex<LoopState>,
}

/// Whether `snapshot` has to be downloaded again at `now`
pub fn needs_refresh(
    snapshot: &CatalogSnapshot,
    now: DateTime<Utc>,
    max_age: chrono::Duration,
) -> bool {
    !snapshot.is_populated() || now - snapshot.fetched_at > max_age
}

impl CatalogCache {
    /// Create an empty cache; nothing is fetched until [`start`](Self::start)
    pub fn new(config: CatalogConfig, source: Arc<dyn CatalogSource>) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(CatalogSnapshot::empty()));

        Self {
            shared: Arc::new(Shared {
                config,
                source,
                snapshot,
                published: AtomicU64::new(0),
            }),
            state: Mutex::new(LoopState::Stopped),
        }
    }

    /// Spawn the background refresh loop
    ///
    /// The first cycle runs immediately. Returns an error if the loop is
    /// already running.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if matches!(*state, LoopState::Running { .. }) {
            anyhow::bail!("Catalog refresh loop is already running");
        }

        let stop = Arc::new(StopSignal::default());
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(shared.run(Arc::clone(&stop)));
        *state = LoopState::Running { handle, stop };

        info!(
            "Catalog refresh loop started (every {} minutes)",
            self.shared.config.refresh_interval_minutes
        );
        Ok(())
    }

    /// Stop the refresh loop and wait for it to exit
    ///
    /// Interrupts the inter-cycle sleep immediately; an in-flight download is
    /// allowed to finish but nothing is fetched or published afterwards.
    pub async fn stop(&self) {
        let running = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match std::mem::replace(&mut *state, LoopState::Stopped) {
                LoopState::Running { handle, stop } => Some((handle, stop)),
                LoopState::Stopped => None,
            }
        };

        let Some((handle, stop)) = running else {
            debug!("Catalog refresh loop is not running");
            return;
        };

        stop.request();

        if let Err(e) = handle.await {
            warn!("Catalog refresh task ended abnormally: {}", e);
        }
    }

    /// Whether the background loop is currently running
    pub fn is_running(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        matches!(*state, LoopState::Running { .. })
    }

    /// Run one refresh cycle on the caller's task
    ///
    /// For tests and one-shot tools that never call [`start`](Self::start).
    /// While the background loop is running it is the only writer, so this
    /// returns [`RefreshOutcome::Skipped`] without touching the snapshot.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        if self.is_running() {
            debug!("Refresh loop is running, ignoring manual refresh");
            return RefreshOutcome::Skipped;
        }
        self.shared.refresh_cycle().await
    }

    /// Current snapshot, without waiting for data
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.shared.snapshot.borrow())
    }

    /// Number of snapshots published since the cache was created
    pub fn refresh_count(&self) -> u64 {
        self.shared.published.load(Ordering::SeqCst)
    }

    /// Wait until a snapshot with metadata has been published
    ///
    /// Returns immediately when data is already available.
    pub async fn wait_for_data(&self) -> std::result::Result<Arc<CatalogSnapshot>, LookupError> {
        let mut receiver = self.shared.snapshot.subscribe();
        let snapshot = receiver
            .wait_for(|snapshot| snapshot.is_populated())
            .await
            .map_err(|_| LookupError::Closed)?;

        Ok(Arc::clone(&snapshot))
    }

    /// Resolve `entity_type` to its repository, YAML and JSON Schema links
    ///
    /// Waits for the first successful refresh if none has happened yet.
    pub async fn lookup(&self, entity_type: &str) -> std::result::Result<LookupResult, LookupError> {
        info!("Requesting links from entity '{}'", entity_type);

        let snapshot = self.wait_for_data().await?;

        snapshot
            .resolve(entity_type)
            .ok_or_else(|| LookupError::NotFound {
                entity_type: entity_type.to_string(),
            })
    }
}

impl Drop for CatalogCache {
    fn drop(&mut self) {
        // Let a still-running loop exit at its next wake point
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let LoopState::Running { stop, .. } = state {
            stop.request();
        }
    }
}

impl Shared {
    async fn run(self: Arc<Self>, stop: Arc<StopSignal>) {
        let interval = self.config.refresh_interval();

        loop {
            if stop.is_requested() {
                break;
            }

            self.refresh_cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop.wake.notified() => break,
            }
        }

        info!("Stopping catalog refresh loop");
    }

    async fn refresh_cycle(&self) -> RefreshOutcome {
        let current = Arc::clone(&self.snapshot.borrow());
        let started = Instant::now();

        let outcome = if !needs_refresh(&current, Utc::now(), self.config.max_age()) {
            debug!(
                "Catalogs fetched at {} are still fresh, skipping download",
                current.fetched_at
            );
            RefreshOutcome::Fresh
        } else {
            match self.download().await {
                Ok((official_list, metadata)) => {
                    info!(
                        "Download complete! {} repositories, {} data models in {:.2} seconds",
                        official_list.len(),
                        metadata.len(),
                        started.elapsed().as_secs_f64()
                    );
                    self.snapshot.send_replace(Arc::new(CatalogSnapshot::new(
                        official_list,
                        metadata,
                        Utc::now(),
                    )));
                    self.published.fetch_add(1, Ordering::SeqCst);
                    RefreshOutcome::Published
                }
                Err(e) => {
                    warn!("Catalog refresh failed, keeping previous data: {}", e);
                    RefreshOutcome::Failed
                }
            }
        };

        // Wake waiters even when nothing changed; they re-check their predicate
        self.snapshot.send_modify(|_| {});
        outcome
    }

    async fn download(
        &self,
    ) -> std::result::Result<(Vec<OfficialListEntry>, Vec<ModelMetadataEntry>), FetchError> {
        let official: OfficialList = self.fetch_document(&self.config.official_list_url).await?;
        let metadata: Vec<ModelMetadataEntry> =
            self.fetch_document(&self.config.metadata_url).await?;

        if official.official_list.is_empty() {
            return Err(empty_catalog(&self.config.official_list_url));
        }
        if metadata.is_empty() {
            return Err(empty_catalog(&self.config.metadata_url));
        }

        Ok((official.official_list, metadata))
    }

    async fn fetch_document<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> std::result::Result<T, FetchError> {
        let value = self.source.fetch(url).await?;

        serde_json::from_value(value).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn empty_catalog(url: &str) -> FetchError {
    FetchError::Decode {
        url: url.to_string(),
        reason: "catalog contains no entries".to_string(),
    }
}
