//! Platform collaborators around the photo store
//!
//! On the desktop the "camera" is a file picker: the chosen image is copied
//! into the gallery's photo folder and that copy is what gets recorded.
//! Sharing hands a copy of the image to a destination the user picks.

use chrono::Local;
use std::io;
use std::path::{Path, PathBuf};
use tokio::{fs, task};
use walkdir::WalkDir;

use crate::error::MediaError;
use crate::state::data::{Coordinates, PhotoRecord};
use crate::state::worker::StoreHandle;

/// Image extensions the gallery will accept (lowercase)
pub const IMAGE_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "tif", "tiff",
];

/// Give up on finding a free capture file name after this many suffixes
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// What the camera hands over after a shot
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResult {
    /// Absolute path of the stored image, recorded verbatim
    pub image_path: String,
    /// None when no location was available
    pub location: Option<Coordinates>,
}

/// Result of a folder import operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub imported_count: usize,
    /// Already in the gallery, left alone
    pub skipped_count: usize,
    pub failed_count: usize,
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Copy `source` into `photo_dir` under a fresh timestamped name
pub async fn take_photo(
    source: PathBuf,
    photo_dir: PathBuf,
    location: Option<Coordinates>,
) -> Result<CaptureResult, MediaError> {
    if !is_supported_image(&source) {
        return Err(MediaError::Unsupported(source));
    }

    let extension = source
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "jpg".to_string());
    let stem = format!("IMG_{}", Local::now().format("%Y%m%d_%H%M%S_%3f"));
    let target = reserve_target(&absolute(&photo_dir), &stem, &extension)
        .await
        .map_err(|source_err| MediaError::Copy {
            from: source.clone(),
            to: photo_dir.join(format!("{}.{}", stem, extension)),
            source: source_err,
        })?;

    if let Err(source_err) = fs::copy(&source, &target).await {
        let _ = fs::remove_file(&target).await;
        return Err(MediaError::Copy {
            from: source,
            to: target,
            source: source_err,
        });
    }

    tracing::info!("📸 Captured {}", target.display());

    Ok(CaptureResult {
        image_path: target.to_string_lossy().to_string(),
        location,
    })
}

/// Take a photo and record it, returning the stored record so the caller
/// can show it right away
pub async fn record_capture(
    source: PathBuf,
    photo_dir: PathBuf,
    location: Option<Coordinates>,
    store: StoreHandle,
) -> Result<PhotoRecord, MediaError> {
    let capture = take_photo(source, photo_dir, location).await?;
    let id = store.insert(capture.image_path, capture.location).await?;

    // Only missing if someone deleted it in between
    store.get(id).await?.ok_or(MediaError::Vanished(id))
}

/// Create an empty file at `<dir>/<stem>.<ext>`, or `<stem>_1.<ext>`,
/// `<stem>_2.<ext>`, ... when that name is taken. Existing files are never
/// opened for writing, so two captures can't end up sharing one file.
async fn reserve_target(dir: &Path, stem: &str, extension: &str) -> io::Result<PathBuf> {
    let mut attempt = 0u32;
    loop {
        let name = match attempt {
            0 => format!("{}.{}", stem, extension),
            n => format!("{}_{}.{}", stem, n, extension),
        };
        let candidate = dir.join(name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(_) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Record every supported image under `folder` in place, without copying.
/// Paths that already have a record are skipped, so importing the same
/// folder twice adds nothing.
///
/// The scan runs on a blocking thread; the inserts go through the store
/// worker one at a time so ids follow the scan order.
pub async fn import_folder(folder: PathBuf, store: StoreHandle) -> Result<ImportSummary, MediaError> {
    tracing::info!("🔍 Scanning folder: {}", folder.display());

    let paths = task::spawn_blocking(move || scan_folder(&folder))
        .await
        .map_err(|e| MediaError::Scan(format!("Task join error: {}", e)))?;

    let mut summary = ImportSummary::default();
    for path in paths {
        let path_str = path.to_string_lossy().to_string();
        match store.contains_path(path_str.clone()).await {
            Ok(true) => {
                summary.skipped_count += 1;
                continue;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!("⚠️  Error importing {}: {}", path.display(), err);
                summary.failed_count += 1;
                continue;
            }
        }
        match store.insert(path_str, None).await {
            Ok(_) => summary.imported_count += 1,
            Err(err) => {
                tracing::warn!("⚠️  Error importing {}: {}", path.display(), err);
                summary.failed_count += 1;
            }
        }
    }

    tracing::info!(
        "✅ Import complete: {} new, {} skipped, {} failed",
        summary.imported_count,
        summary.skipped_count,
        summary.failed_count
    );
    Ok(summary)
}

/// Supported images under `folder`, in a stable (sorted) order
fn scan_folder(folder: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| absolute(entry.path()))
        .filter(|path| is_supported_image(path))
        .collect();
    paths.dedup();
    paths
}

/// Copy the image to where the user wants to share it.
///
/// Never touches the store.
pub async fn share(image_path: String, destination: PathBuf) -> Result<PathBuf, MediaError> {
    let from = PathBuf::from(image_path);
    fs::copy(&from, &destination)
        .await
        .map_err(|source| MediaError::Copy {
            from,
            to: destination.clone(),
            source,
        })?;

    tracing::info!("📤 Shared image to {}", destination.display());
    Ok(destination)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
