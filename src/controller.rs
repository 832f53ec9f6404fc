//! Cycle controller.
//!
//! Runs one scheduled cycle end to end:
//!
//! ```text
//! Bootstrap: announce → fetch top N → store
//! Steady:    lookup held ids → diff → format → publish thread → fetch top N → store
//! ```
//!
//! The held snapshot lives in the [`SnapshotStore`] handed to the
//! controller. It is overwritten at the end of every cycle that gets that far,
//! whether or not anything was published. A cycle that fails earlier leaves
//! it untouched, so the next run diffs against the same baseline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::differ::{diff, diff_by_id, DiffError};
use crate::formatter::{FormatError, SegmentFormatter};
use crate::publisher::{PartialThread, PublishError, Publisher, ThreadPublisher};
use crate::source::{LeaderboardSource, SourceError};
use crate::store::{SnapshotStore, StoreError, StoredSnapshot};
use crate::types::{IdentityChange, Snapshot, ThreadLink};
use crate::DEFAULT_LEADERBOARD_SIZE;

/// One-time introduction posted on the very first cycle.
pub const DEFAULT_INTRO_MESSAGE: &str = "gm! I bring updates of farcaster users' usage of fully \
    decentralized domains (via ens!). Look forward to updates of popular farcaster accounts that \
    switch their original fnames to a .eth name!";

/// Error type for cycles that could not complete.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// Another cycle holds the controller.
    #[error("A cycle is already in flight")]
    AlreadyRunning,
    /// A data source call failed; the held snapshot was not replaced.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] SourceError),
    /// The snapshot store failed.
    #[error("Snapshot store failed: {0}")]
    Store(#[from] StoreError),
}

/// Which state the controller found the store in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleState {
    /// No held snapshot yet.
    Bootstrap,
    /// A held snapshot is available to diff against.
    Steady(StoredSnapshot),
}

/// Why nothing (or only part) of today's announcement went out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishFailure {
    /// The bootstrap introduction was rejected.
    Announcement(PublishError),
    /// The changes could not be rendered within the segment limit.
    Format(FormatError),
    /// The thread stopped part way.
    Thread(PartialThread),
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Correlation id used in this cycle's logs.
    pub cycle_id: Uuid,
    /// True when the cycle ran the bootstrap path.
    pub bootstrap: bool,
    /// Renames detected, in announcement order.
    pub changes: Vec<IdentityChange>,
    /// Alignment problem the differ reported, if any.
    pub diff_issue: Option<DiffError>,
    /// Links published this cycle.
    pub links: Vec<ThreadLink>,
    /// Publishing problem, if any.
    pub publish_failure: Option<PublishFailure>,
    /// Size of the snapshot now held.
    pub stored_entries: usize,
    /// Fingerprint of the snapshot now held.
    pub stored_fingerprint: String,
}

/// Tunables for the controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// How many leaderboard rows to track.
    pub leaderboard_size: usize,
    /// Bootstrap introduction text.
    pub intro_message: String,
    /// Segment packing.
    pub formatter: SegmentFormatter,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            intro_message: DEFAULT_INTRO_MESSAGE.to_string(),
            formatter: SegmentFormatter::default(),
        }
    }
}

/// Releases the in-flight flag when a cycle ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates scheduled cycles.
pub struct CycleController<S, P, K>
where
    S: LeaderboardSource,
    P: Publisher,
    K: SnapshotStore,
{
    source: S,
    thread: ThreadPublisher<P>,
    store: K,
    config: ControllerConfig,
    in_flight: AtomicBool,
}

impl<S, P, K> CycleController<S, P, K>
where
    S: LeaderboardSource,
    P: Publisher,
    K: SnapshotStore,
{
    /// Create a controller with default tunables.
    pub fn new(source: S, publisher: P, store: K) -> Self {
        Self::with_config(source, publisher, store, ControllerConfig::default())
    }

    /// Create a controller with explicit tunables.
    pub fn with_config(source: S, publisher: P, store: K, config: ControllerConfig) -> Self {
        Self {
            source,
            thread: ThreadPublisher::new(publisher),
            store,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Borrow the data source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Borrow the publishing backend.
    pub fn publisher(&self) -> &P {
        self.thread.publisher()
    }

    /// Borrow the snapshot store.
    pub fn store(&self) -> &K {
        &self.store
    }

    /// Read the store to see which path the next cycle takes.
    pub async fn state(&self) -> Result<CycleState, StoreError> {
        Ok(match self.store.load().await? {
            Some(record) => CycleState::Steady(record),
            None => CycleState::Bootstrap,
        })
    }

    /// Run one cycle.
    ///
    /// Refuses to start while another cycle is running.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or(CycleError::AlreadyRunning)?;

        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", cycle_id = %cycle_id);

        async {
            let start = Instant::now();
            let report = match self.state().await? {
                CycleState::Bootstrap => self.bootstrap(cycle_id).await?,
                CycleState::Steady(held) => self.steady(cycle_id, held).await?,
            };

            info!(
                bootstrap = report.bootstrap,
                change_count = report.changes.len(),
                published = report.links.len(),
                publish_failed = report.publish_failure.is_some(),
                stored_entries = report.stored_entries,
                fingerprint = %report.stored_fingerprint,
                latency_ms = start.elapsed().as_millis() as u64,
                "Cycle complete"
            );
            Ok::<_, CycleError>(report)
        }
        .instrument(span)
        .await
    }

    async fn bootstrap(&self, cycle_id: Uuid) -> Result<CycleReport, CycleError> {
        info!("No held snapshot, bootstrapping");

        let (links, publish_failure) = match self
            .thread
            .publish_announcement(&self.config.intro_message)
            .await
        {
            Ok(link) => (vec![link], None),
            Err(e) => {
                warn!(error = %e, "Introduction failed to publish");
                (Vec::new(), Some(PublishFailure::Announcement(e)))
            }
        };

        let stored = self.refresh().await?;

        Ok(CycleReport {
            cycle_id,
            bootstrap: true,
            changes: Vec::new(),
            diff_issue: None,
            links,
            publish_failure,
            stored_entries: stored.snapshot.len(),
            stored_fingerprint: stored.fingerprint,
        })
    }

    async fn steady(&self, cycle_id: Uuid, held: StoredSnapshot) -> Result<CycleReport, CycleError> {
        info!(
            held_entries = held.snapshot.len(),
            fingerprint = %held.fingerprint,
            captured_at = %held.captured_at,
            "Diffing against held snapshot"
        );

        let current = self.source.fetch_by_id_list(&held.snapshot.ids()).await?;
        let (changes, diff_issue) = Self::detect(&held.snapshot, &current);

        let mut links = Vec::new();
        let mut publish_failure = None;

        if changes.is_empty() {
            info!("No renames detected");
        } else {
            match self.config.formatter.format(&changes) {
                Ok(segments) => {
                    info!(change_count = changes.len(), segments = segments.len(), "Publishing thread");
                    match self.thread.publish_thread(&segments).await {
                        Ok(published) => links = published,
                        Err(partial) => {
                            links = partial.links.clone();
                            publish_failure = Some(PublishFailure::Thread(partial));
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Changes could not be formatted");
                    publish_failure = Some(PublishFailure::Format(e));
                }
            }
        }

        let stored = self.refresh().await?;

        Ok(CycleReport {
            cycle_id,
            bootstrap: false,
            changes,
            diff_issue,
            links,
            publish_failure,
            stored_entries: stored.snapshot.len(),
            stored_fingerprint: stored.fingerprint,
        })
    }

    /// Diff held against current, falling back to the keyed diff when the
    /// lookup came back out of order.
    fn detect(held: &Snapshot, current: &Snapshot) -> (Vec<IdentityChange>, Option<DiffError>) {
        match diff(held, current) {
            Ok(changes) => (changes, None),
            Err(DiffError::LengthMismatch { expected, actual, partial }) => {
                warn!(expected, actual, "Lookup returned a different number of rows, using common prefix");
                let issue = DiffError::LengthMismatch { expected, actual, partial: partial.clone() };
                (partial, Some(issue))
            }
            Err(issue @ DiffError::Misaligned { .. }) => {
                warn!(error = %issue, "Lookup out of order, diffing by member id");
                let keyed = diff_by_id(held, current);
                info!(
                    change_count = keyed.changes.len(),
                    left = keyed.left.len(),
                    joined = keyed.joined.len(),
                    "Keyed diff complete"
                );
                (keyed.changes, Some(issue))
            }
        }
    }

    /// Fetch the current leaderboard and make it tomorrow's baseline.
    async fn refresh(&self) -> Result<StoredSnapshot, CycleError> {
        let fresh = self.source.fetch_top_n(self.config.leaderboard_size).await?;
        let record = StoredSnapshot::capture(fresh);
        self.store.save(&record).await?;

        info!(entries = record.snapshot.len(), fingerprint = %record.fingerprint, "Held snapshot replaced");
        Ok(record)
    }
}
