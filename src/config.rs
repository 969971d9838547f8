//! Where the gallery keeps its database and captured photos

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Database file name. Matches what earlier versions of the app wrote,
/// so an existing gallery is picked up as-is.
pub const DATABASE_FILE: &str = "imageGallery.db";

/// Application folder inside the user's data directory
pub const APP_DIR: &str = "photo-gallery";

/// Subfolder for photos taken through the app
pub const PHOTO_DIR: &str = "photos";

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryConfig {
    root: PathBuf,
}

impl GalleryConfig {
    /// Use the platform data directory:
    /// - Linux: ~/.local/share/photo-gallery
    /// - macOS: ~/Library/Application Support/photo-gallery
    /// - Windows: %APPDATA%\photo-gallery
    pub fn from_default_location() -> Result<Self, StoreError> {
        let mut root = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(StoreError::NoDataDir)?;
        root.push(APP_DIR);
        Ok(Self { root })
    }

    /// Keep everything under `root` instead of the platform data directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn photo_dir(&self) -> PathBuf {
        self.root.join(PHOTO_DIR)
    }

    /// Create the application and photo directories if they are missing
    pub fn prepare(&self) -> Result<(), StoreError> {
        let photo_dir = self.photo_dir();
        fs::create_dir_all(&photo_dir).map_err(|source| StoreError::DataDir {
            path: photo_dir,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_live_under_root() {
        let config = GalleryConfig::with_root("/tmp/gallery");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/gallery/imageGallery.db"));
        assert_eq!(config.photo_dir(), PathBuf::from("/tmp/gallery/photos"));
    }

    #[test]
    fn test_prepare_creates_photo_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = GalleryConfig::with_root(dir.path().join("nested"));

        config.prepare().unwrap();
        config.prepare().unwrap();

        assert!(config.photo_dir().is_dir());
    }

    #[test]
    fn test_default_location_ends_with_app_dir() {
        if let Ok(config) = GalleryConfig::from_default_location() {
            assert!(config.root().ends_with(APP_DIR));
        }
    }
}
