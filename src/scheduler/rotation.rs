//! Banner rotation cycle
//!
//! [`BannerRotation`] owns the single in-memory [`Catalog`] for the process
//! lifetime, established by the startup reconciliation. One cycle runs
//! select → publish → record:
//!
//! - selection never touches the catalog
//! - a publisher failure abandons the cycle with the catalog unchanged, so
//!   the banner stays eligible (and favored) next time
//! - a successful publish stamps the banner with the cycle's start time and
//!   persists the catalog
//!
//! The directory is not rescanned between cycles; new images show up after
//! the next reconciliation (process restart).

use chrono::{DateTime, TimeZone, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::error::{SchedulerError, SchedulerResult};
use super::report::{CycleOutcome, CycleReport, CycleResult};
use super::schedule::{iso_week_number, ScheduleMode};
use super::selection::select_next;
use crate::catalog::{Catalog, CatalogStore};
use crate::publisher::{PublishRequest, Publisher};

/// Select-publish-record driver over one catalog
pub struct BannerRotation<P> {
    store: CatalogStore,
    catalog: Catalog,
    publisher: P,
    rng: ChaCha8Rng,
}

impl<P: Publisher> BannerRotation<P> {
    /// Create a rotation over a reconciled catalog
    ///
    /// Refuses to start with no candidates.
    pub fn new(store: CatalogStore, catalog: Catalog, publisher: P) -> SchedulerResult<Self> {
        if catalog.is_empty() {
            return Err(SchedulerError::EmptyCatalog);
        }

        Ok(Self {
            store,
            catalog,
            publisher,
            rng: ChaCha8Rng::from_entropy(),
        })
    }

    /// Seed the lottery for reproducible draws
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Current in-memory catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Run one cycle now
    pub async fn run_cycle(&mut self) -> CycleResult {
        self.run_cycle_at(Utc::now()).await
    }

    /// Handle a scheduled fire, applying the biweekly parity rule
    pub async fn run_fire<Tz: TimeZone>(
        &mut self,
        mode: ScheduleMode,
        fire: &DateTime<Tz>,
    ) -> CycleResult {
        let fire_date = fire.date_naive();
        if !mode.executes_on(fire_date) {
            let iso_week = iso_week_number(fire_date);
            let mut report = CycleReport::new(Utc::now());
            report.skipped(format!(
                "Skipped: ISO week {iso_week} is odd ({mode} schedule publishes on even weeks)"
            ));
            tracing::info!(%fire_date, iso_week, "Fire skipped by biweekly parity");

            return CycleResult {
                outcome: CycleOutcome::Skipped { iso_week },
                report,
            };
        }

        self.run_cycle().await
    }

    /// Run one cycle that started at `started_at`
    ///
    /// `started_at` is the report timestamp and the usage timestamp recorded
    /// on success.
    pub async fn run_cycle_at(&mut self, started_at: DateTime<Utc>) -> CycleResult {
        let mut report = CycleReport::new(started_at);

        let identity = match select_next(&self.catalog, &mut self.rng) {
            Ok(entry) => entry.identity.clone(),
            Err(e) => {
                report.error(e.to_string());
                tracing::warn!(error = %e, "Selection failed");
                return finish(
                    CycleOutcome::SelectionFailed {
                        reason: e.to_string(),
                    },
                    report,
                );
            }
        };
        tracing::info!(identity = %identity, publisher = self.publisher.name(), "Publishing banner");

        let request = PublishRequest::banner(identity.as_str());
        if let Err(e) = self.publisher.publish(&request, &mut report).await {
            report.error(e.to_string());
            tracing::warn!(
                identity = %identity,
                error = %e,
                recoverable = e.is_recoverable(),
                "Publish failed, catalog left unchanged"
            );
            return finish(
                CycleOutcome::PublisherFailure {
                    identity,
                    reason: e.to_string(),
                },
                report,
            );
        }

        // A clock stepping backwards must not move a timestamp back
        let current = self
            .catalog
            .get(&identity)
            .map(|e| e.last_used_at)
            .unwrap_or_default();
        let used_at = started_at.timestamp().max(current);

        match self.store.record_usage(&self.catalog, &identity, used_at) {
            Ok(updated) => {
                self.catalog = updated;
                report.success(format!("Updated banner metadata with lastUsed: {used_at}"));
                finish(CycleOutcome::Published { identity, used_at }, report)
            }
            Err(e) => {
                // The banner is live; keep the in-memory catalog truthful even
                // though the file could not be written.
                if let Ok(updated) = self.catalog.with_usage(&identity, used_at) {
                    self.catalog = updated;
                }
                report.error(format!("Failed to record banner usage: {e}"));
                tracing::error!(identity = %identity, error = %e, "Recording usage failed");
                finish(
                    CycleOutcome::RecordFailed {
                        identity,
                        reason: e.to_string(),
                    },
                    report,
                )
            }
        }
    }
}

fn finish(outcome: CycleOutcome, report: CycleReport) -> CycleResult {
    tracing::info!("{report}");
    CycleResult { outcome, report }
}
