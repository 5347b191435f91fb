//! Banner rotation scheduling
//!
//! This module drives the rotation: picking the next banner with a weighted
//! least-recently-used lottery, handing it to a [`Publisher`], recording the
//! usage, and repeating on a fixed cadence.
//!
//! # Overview
//!
//! The catalog is reconciled once at startup and owned by a single
//! [`BannerRotation`] for the rest of the process lifetime. A
//! [`RotationTrigger`] sleeps until the next fire of the chosen
//! [`ScheduleMode`] and runs one cycle per fire, never more than one at a
//! time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     RotationTrigger                      │
//! │   next_fire_after ──► sleep ──► parity check (biweekly)  │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ one cycle at a time
//!                       ┌──────▼──────┐
//!                       │   Banner    │
//!                       │  Rotation   │
//!                       └──┬───┬───┬──┘
//!          select_next ◄───┘   │   └───► CatalogStore::record_usage
//!                              ▼
//!                          Publisher
//! ```
//!
//! # Modules
//!
//! - [`selection`] - Weighted least-recently-used lottery
//! - [`schedule`] - Schedule modes, fire times and ISO week parity
//! - [`rotation`] - One select → publish → record cycle
//! - [`trigger`] - Timer loop, overrun skipping and events
//! - [`report`] - Human-readable cycle reports and outcomes
//!
//! # Quick Start
//!
//! ```ignore
//! use skybanner::catalog::CatalogStore;
//! use skybanner::scheduler::{BannerRotation, RotationTrigger, ScheduleMode};
//!
//! let store = CatalogStore::new("./bannerData.json");
//! let catalog = store.reconcile(Path::new("./Banners"))?;
//!
//! let rotation = BannerRotation::new(store, catalog, publisher)?;
//! let trigger = RotationTrigger::new(ScheduleMode::Biweekly, rotation);
//!
//! let mut events = trigger.subscribe();
//! trigger.start().await?;
//! ```
//!
//! # Schedule Modes
//!
//! | Mode | Fires | Publishes |
//! |------|-------|-----------|
//! | `hourly` | every hour at :00 | every fire |
//! | `daily` | midnight | every fire |
//! | `weekly` | Sunday midnight | every fire |
//! | `biweekly` | Sunday midnight | even ISO weeks only |
//! | `monthly` | 1st of the month, midnight | every fire |
//!
//! [`Publisher`]: crate::publisher::Publisher

pub mod error;
pub mod report;
pub mod rotation;
pub mod schedule;
pub mod selection;
pub mod trigger;

// Re-export main types
pub use error::{SchedulerError, SchedulerResult};
pub use report::{CycleOutcome, CycleReport, CycleResult};
pub use rotation::BannerRotation;
pub use schedule::{is_even_iso_week, iso_week_number, ScheduleMode, FIRE_WEEKDAY};
pub use selection::{select_next, select_with_draw, total_weight, weighted_order, WeightedBanner};
pub use trigger::{missed_fires, RotationTrigger, TriggerEvent, TriggerStatus};
