//! Shared data structures for the application state
//!
//! These structs represent the data model that flows between
//! the database layer and the UI layer.

use rusqlite::Row;

/// A GPS fix taken when the photo was captured
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Represents a single captured photo in the gallery
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    /// Unique database ID, assigned on insert and never reused
    pub id: i64,
    /// Full path to the image file. May point at a file that no longer exists.
    pub image_path: String,
    /// Reserved column, never written by the app
    pub image_data: Option<String>,
    /// None when location permission was not granted
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PhotoRecord {
    /// Column list matching `from_row`. Keep the two in sync.
    pub(crate) const COLUMNS: &'static str = "id, image_path, image_data, latitude, longitude";

    /// Map a row selected with `COLUMNS` into a record.
    ///
    /// Fails on any unexpected column type, e.g. a NULL `image_path`.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PhotoRecord {
            id: row.get(0)?,
            image_path: row.get(1)?,
            image_data: row.get(2)?,
            latitude: row.get(3)?,
            longitude: row.get(4)?,
        })
    }

    /// Both coordinates, or None if either one is missing
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        }
    }

    /// File name for display, falling back to the full path
    pub fn file_name(&self) -> &str {
        std::path::Path::new(&self.image_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.image_path)
    }
}
