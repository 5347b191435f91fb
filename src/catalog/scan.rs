//! Candidate directory listing

use std::fs;
use std::path::{Component, Path, PathBuf};

use super::error::{CatalogError, CatalogResult};

/// Image extensions eligible for rotation (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Check whether a path carries a supported image extension
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Identity of `file_name` inside `dir`
///
/// `.` components are dropped, so `./Banners` and `Banners` yield the same
/// `Banners/a.jpg` that existing data files store.
pub fn identity_for(dir: &Path, file_name: impl AsRef<Path>) -> String {
    let dir: PathBuf = dir
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    dir.join(file_name).to_string_lossy().into_owned()
}

/// List the candidate banners in `dir`
///
/// Returns identities (see [`identity_for`]) of regular files with
/// a supported extension, sorted so that newly discovered files enter the
/// catalog in a stable order. Subdirectories are not descended into.
pub fn list_candidates(dir: &Path) -> CatalogResult<Vec<String>> {
    let read_dir = fs::read_dir(dir).map_err(|e| CatalogError::directory_unreadable(dir, e))?;

    let mut candidates = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| CatalogError::directory_unreadable(dir, e))?;
        let path = dir.join(entry.file_name());

        if !is_supported_image(&path) || !path.is_file() {
            continue;
        }

        candidates.push(identity_for(dir, entry.file_name()));
    }

    candidates.sort();
    tracing::debug!(dir = %dir.display(), count = candidates.len(), "Listed candidate banners");
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("a.jpg")));
        assert!(is_supported_image(Path::new("a.JPEG")));
        assert!(is_supported_image(Path::new("dir/a.Png")));
        assert!(!is_supported_image(Path::new("a.gif")));
        assert!(!is_supported_image(Path::new("a.webp")));
        assert!(!is_supported_image(Path::new("README")));
        assert!(!is_supported_image(Path::new(".png")));
    }

    #[test]
    fn test_identity_for_drops_current_dir() {
        let expected = Path::new("Banners").join("a.jpg").to_string_lossy().into_owned();
        assert_eq!(identity_for(Path::new("./Banners"), "a.jpg"), expected);
        assert_eq!(identity_for(Path::new("Banners"), "a.jpg"), expected);
        assert_eq!(identity_for(Path::new("./Banners/./"), "a.jpg"), expected);
        assert_eq!(identity_for(Path::new("."), "a.jpg"), "a.jpg");
        assert_eq!(
            identity_for(Path::new("/srv/banners"), "b.png"),
            Path::new("/srv/banners/b.png").to_string_lossy()
        );
    }

    #[test]
    fn test_list_candidates_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.jpg", "c.JPEG", "notes.txt", "anim.gif"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.jpg")).unwrap();

        let listed = list_candidates(dir.path()).unwrap();
        let names: Vec<_> = listed
            .iter()
            .map(|p| Path::new(p).file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(names, vec!["a.jpg", "b.png", "c.JPEG"]);
        assert!(listed[0].starts_with(&*dir.path().to_string_lossy()));
    }

    #[test]
    fn test_list_candidates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = list_candidates(&missing).unwrap_err();
        assert!(matches!(err, CatalogError::DirectoryUnreadable { .. }));
    }
}
