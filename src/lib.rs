//! skybanner - Rotating Bluesky profile banners
//!
//! Picks a banner from a local directory of images, favoring the ones used
//! least recently, fits it to 1500x500 and publishes it to a Bluesky profile
//! on a recurring schedule.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`catalog`] - Banner catalog, directory reconciliation and persistence
//! - [`scheduler`] - Weighted selection, schedule modes and the rotation loop
//! - [`publisher`] - Image processing and the AT Protocol client
//! - [`config`] - Configuration management and settings
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use skybanner::catalog::CatalogStore;
//! use skybanner::config::Config;
//! use skybanner::publisher::BlueskyPublisher;
//! use skybanner::scheduler::BannerRotation;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = CatalogStore::new(&config.rotation.data_file);
//!     let catalog = store.reconcile(&config.rotation.banner_dir)?;
//!
//!     let publisher = BlueskyPublisher::new(config.bluesky.clone())?;
//!     let mut rotation = BannerRotation::new(store, catalog, publisher)?;
//!     let result = rotation.run_cycle().await;
//!     println!("{}", result.report);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod publisher;
pub mod scheduler;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{BannerEntry, Catalog, CatalogError, CatalogStore};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, SkybannerErrorTrait};
    pub use crate::publisher::{
        BlueskyPublisher, FitPolicy, PublishError, PublishRequest, Publisher,
    };
    pub use crate::scheduler::{
        BannerRotation, CycleOutcome, CycleReport, RotationTrigger, ScheduleMode, TriggerEvent,
    };
}

// Direct re-exports for convenience
pub use catalog::{BannerEntry, Catalog};
pub use scheduler::ScheduleMode;
