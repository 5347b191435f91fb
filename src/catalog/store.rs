//! JSON persistence for the banner catalog
//!
//! The catalog lives in a single JSON file at a fixed location. Reads treat a
//! missing file as "first run"; any other read or parse failure is fatal for
//! the current cycle. Writes go to a temp file that is renamed over the
//! target, so a crash mid-write never leaves a truncated catalog.
//!
//! # Example
//!
//! ```no_run
//! use skybanner::catalog::CatalogStore;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let store = CatalogStore::new("./bannerData.json");
//! let catalog = store.reconcile(Path::new("./Banners"))?;
//! println!("{} banners available", catalog.len());
//! # Ok(())
//! # }
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::error::{CatalogError, CatalogResult};
use super::scan::list_candidates;
use super::Catalog;

/// File-backed catalog storage
#[derive(Debug, Clone)]
pub struct CatalogStore {
    /// Path of the catalog JSON file
    path: PathBuf,
}

impl CatalogStore {
    /// Create a store for the given catalog file (the file need not exist)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the catalog file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted catalog, or an empty one on first run
    pub fn load(&self) -> CatalogResult<Catalog> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No persisted catalog, starting empty");
            return Ok(Catalog::new());
        }

        let file = File::open(&self.path).map_err(|e| CatalogError::unreadable(&self.path, e))?;
        let reader = BufReader::new(file);
        let catalog: Catalog =
            serde_json::from_reader(reader).map_err(|e| CatalogError::unreadable(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), entries = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Durably replace the persisted catalog
    pub fn save(&self, catalog: &Catalog) -> CatalogResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CatalogError::write_failed(&self.path, e))?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "catalog.json".to_string());
        let temp_path = self.path.with_file_name(format!("{file_name}.tmp"));

        let file = File::create(&temp_path).map_err(|e| CatalogError::write_failed(&temp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, catalog)
            .map_err(|e| CatalogError::write_failed(&temp_path, e))?;
        writer
            .flush()
            .map_err(|e| CatalogError::write_failed(&temp_path, e))?;
        drop(writer);

        fs::rename(&temp_path, &self.path).map_err(|e| CatalogError::write_failed(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), entries = catalog.len(), "Catalog saved");
        Ok(())
    }

    /// Reconcile the persisted catalog with the images in `banner_dir`
    ///
    /// Both inputs are read before anything is written: if either fails, the
    /// persisted file is left exactly as it was. On success the reconciled
    /// catalog is persisted immediately.
    pub fn reconcile(&self, banner_dir: &Path) -> CatalogResult<Catalog> {
        let persisted = self.load()?;
        let listing = list_candidates(banner_dir)?;

        let known = persisted.len();
        let reconciled = Catalog::reconcile(persisted, listing);
        self.save(&reconciled)?;

        tracing::info!(
            dir = %banner_dir.display(),
            previously_known = known,
            banners = reconciled.len(),
            "Catalog reconciled"
        );
        Ok(reconciled)
    }

    /// Record a successful publish of `identity` at `timestamp` and persist
    ///
    /// Returns the updated catalog; `catalog` itself is not modified.
    pub fn record_usage(
        &self,
        catalog: &Catalog,
        identity: &str,
        timestamp: i64,
    ) -> CatalogResult<Catalog> {
        let updated = catalog.with_usage(identity, timestamp)?;
        self.save(&updated)?;

        tracing::debug!(identity, timestamp, "Banner usage recorded");
        Ok(updated)
    }
}
