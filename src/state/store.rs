use rusqlite::{params, Connection, OptionalExtension};
use std::io;
use std::path::{Path, PathBuf};

use super::data::{Coordinates, PhotoRecord};
use crate::error::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

/// What happened when a photo was removed together with its file
#[derive(Debug, Clone, PartialEq)]
pub enum Removal {
    /// Row and file are both gone
    Removed(PhotoRecord),
    /// Row is gone, the file had already been removed by someone else
    FileMissing(PhotoRecord),
    /// No record with that id. Not an error.
    NoRecord,
}

/// The PhotoRecordStore owns the SQLite table of captured photos.
/// It stores each photo's file path and the GPS fix taken with it.
/// The image files themselves belong to the caller.
pub struct PhotoRecordStore {
    conn: Connection,
    db_path: PathBuf,
}

impl PhotoRecordStore {
    /// Open (or create) the database file and make sure the table exists.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path)?;

        tracing::info!("📁 Photo database opened at {}", db_path.display());

        let store = PhotoRecordStore { conn, db_path };
        store.ensure_schema()?;
        Ok(store)
    }

    /// A private store that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = PhotoRecordStore {
            conn,
            db_path: PathBuf::from(":memory:"),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Close the connection, reporting any error SQLite raises while doing so
    pub fn close(self) -> Result<()> {
        let db_path = self.db_path;
        self.conn.close().map_err(|(_, err)| StoreError::Storage(err))?;
        tracing::debug!("Photo database closed: {}", db_path.display());
        Ok(())
    }

    /// Create the Images table if it is missing. Safe to call any number of times.
    ///
    /// The layout is the one earlier versions of the app created, so their
    /// databases open unchanged. AUTOINCREMENT keeps ids from being reused.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS Images (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    image_path  TEXT,
                    image_data  TEXT,
                    latitude    REAL,
                    longitude   REAL
                )",
                [],
            )
            .map_err(StoreError::Schema)?;
        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Record a captured photo and return its new id
    pub fn insert(&self, image_path: &str, location: Option<Coordinates>) -> Result<i64> {
        if image_path.is_empty() {
            return Err(StoreError::EmptyImagePath);
        }

        self.ensure_schema()?;

        let (latitude, longitude) = match location {
            Some(c) => (Some(c.latitude), Some(c.longitude)),
            None => (None, None),
        };

        self.conn.execute(
            "INSERT INTO Images (image_path, latitude, longitude) VALUES (?1, ?2, ?3)",
            params![image_path, latitude, longitude],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, image_path, "photo recorded");
        Ok(id)
    }

    /// Every record, oldest first (ascending id)
    pub fn list_all(&self) -> Result<Vec<PhotoRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM Images ORDER BY id ASC",
            PhotoRecord::COLUMNS
        ))?;

        let records = stmt
            .query_map([], PhotoRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    pub fn get(&self, id: i64) -> Result<Option<PhotoRecord>> {
        find(&self.conn, id)
    }

    /// Whether some record already points at `image_path` (exact match)
    pub fn contains_path(&self, image_path: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM Images WHERE image_path = ?1)",
            params![image_path],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Images", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Remove one record. Deleting an unknown id is a no-op, not an error.
    ///
    /// Returns whether a row was actually removed. The image file is left alone.
    pub fn delete_by_id(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM Images WHERE id = ?1", params![id])?;

        if changed == 0 {
            tracing::debug!(id, "delete requested for unknown photo");
        }
        Ok(changed > 0)
    }

    /// Remove every record. The id sequence is kept, so old ids stay retired.
    pub fn clear(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM Images", [])?;
        tracing::info!("🗑️  Cleared {} photo records", removed);
        Ok(removed)
    }

    /// Delete a record and its image file as one step.
    ///
    /// The row delete runs in a transaction that only commits once
    /// `remove_file` succeeds (or reports the file as already gone).
    /// Any other file error rolls the row back and is returned.
    pub fn remove_with_file<F>(&mut self, id: i64, remove_file: F) -> Result<Removal>
    where
        F: FnOnce(&Path) -> io::Result<()>,
    {
        let tx = self.conn.transaction()?;

        let Some(record) = find(&tx, id)? else {
            return Ok(Removal::NoRecord);
        };

        tx.execute("DELETE FROM Images WHERE id = ?1", params![id])?;

        let path = PathBuf::from(&record.image_path);
        match remove_file(&path) {
            Ok(()) => {
                tx.commit()?;
                Ok(Removal::Removed(record))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tx.commit()?;
                tracing::warn!("Image file was already gone: {}", path.display());
                Ok(Removal::FileMissing(record))
            }
            Err(source) => Err(file_removal_error(tx.rollback(), path, source)),
        }
    }
}

/// The file is still on disk, so the caller hears about that even when the
/// rollback fails. An unfinished transaction is rolled back on drop anyway.
fn file_removal_error(rollback: rusqlite::Result<()>, path: PathBuf, source: io::Error) -> StoreError {
    if let Err(err) = rollback {
        tracing::error!("Rollback after failed file removal failed: {}", err);
    }
    StoreError::FileRemoval { path, source }
}

fn find(conn: &Connection, id: i64) -> Result<Option<PhotoRecord>> {
    let record = conn
        .query_row(
            &format!("SELECT {} FROM Images WHERE id = ?1", PhotoRecord::COLUMNS),
            params![id],
            PhotoRecord::from_row,
        )
        .optional()?;
    Ok(record)
}

impl std::fmt::Debug for PhotoRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoRecordStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::OpenFlags;

    fn store() -> PhotoRecordStore {
        PhotoRecordStore::open_in_memory().unwrap()
    }

    fn table_count(store: &PhotoRecordStore) -> i64 {
        store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'Images'",
                [],
                |row| row.get(0),
            )
            .unwrap()
    }

    fn column_names(store: &PhotoRecordStore) -> Vec<String> {
        let mut stmt = store.conn.prepare("PRAGMA table_info(Images)").unwrap();
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        names
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let store = store();
        for _ in 0..5 {
            store.ensure_schema().unwrap();
        }

        assert_eq!(table_count(&store), 1);
        assert_eq!(
            column_names(&store),
            vec!["id", "image_path", "image_data", "latitude", "longitude"]
        );
    }

    #[test]
    fn test_schema_keeps_existing_rows() {
        let store = store();
        store.insert("/a.jpg", None).unwrap();
        store.ensure_schema().unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_ids_strictly_increase() {
        let store = store();
        let mut last = 0;
        for i in 0..20 {
            let id = store.insert(&format!("/photo_{}.jpg", i), None).unwrap();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn test_ids_are_not_reused() {
        let store = store();
        store.insert("/a.jpg", None).unwrap();
        let newest = store.insert("/b.jpg", None).unwrap();

        store.delete_by_id(newest).unwrap();
        let next = store.insert("/c.jpg", None).unwrap();
        assert!(next > newest);

        store.clear().unwrap();
        let after_clear = store.insert("/d.jpg", None).unwrap();
        assert!(after_clear > next);
    }

    #[test]
    fn test_list_all_returns_every_record() {
        let store = store();
        let mut expected = Vec::new();
        for i in 0..10 {
            let path = format!("/photos/{}.jpg", i);
            let location = (i % 2 == 0).then(|| Coordinates::new(i as f64, -(i as f64)));
            let id = store.insert(&path, location).unwrap();
            expected.push((id, path, location));
        }

        let records = store.list_all().unwrap();
        assert_eq!(records.len(), expected.len());
        for (record, (id, path, location)) in records.iter().zip(&expected) {
            assert_eq!(record.id, *id);
            assert_eq!(&record.image_path, path);
            assert_eq!(record.coordinates(), *location);
            assert_eq!(record.image_data, None);
        }
    }

    #[test]
    fn test_list_all_empty() {
        assert!(store().list_all().unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_only_that_record() {
        let store = store();
        let a = store.insert("/a.jpg", None).unwrap();
        let b = store.insert("/b.jpg", Some(Coordinates::new(1.0, 2.0))).unwrap();
        let c = store.insert("/c.jpg", None).unwrap();
        let before = store.list_all().unwrap();

        assert!(store.delete_by_id(b).unwrap());

        let after = store.list_all().unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1], before[2]);
        assert_eq!(after.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a, c]);
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let store = store();
        let id = store.insert("/a.jpg", None).unwrap();
        let before = store.list_all().unwrap();

        assert!(!store.delete_by_id(id + 100).unwrap());
        assert!(store.delete_by_id(id).unwrap());
        assert!(!store.delete_by_id(id).unwrap());

        assert_eq!(before.len(), 1);
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_coordinates_round_trip_exactly() {
        let store = store();
        let values = [
            (1.0, 2.0),
            (-33.868_820_123_456_7, 151.209_295_987_654_3),
            (89.999_999_999, -179.999_999_999),
        ];
        for (lat, lon) in values {
            let id = store.insert("/p.jpg", Some(Coordinates::new(lat, lon))).unwrap();
            let record = store.get(id).unwrap().unwrap();
            assert_eq!(record.latitude, Some(lat));
            assert_eq!(record.longitude, Some(lon));
        }
    }

    #[test]
    fn test_capture_then_delete_scenario() {
        let store = store();
        assert_eq!(store.insert("/a.jpg", None).unwrap(), 1);
        assert_eq!(store.insert("/b.jpg", Some(Coordinates::new(10.5, 20.5))).unwrap(), 2);

        assert_eq!(
            store.list_all().unwrap(),
            vec![
                PhotoRecord {
                    id: 1,
                    image_path: "/a.jpg".to_string(),
                    image_data: None,
                    latitude: None,
                    longitude: None,
                },
                PhotoRecord {
                    id: 2,
                    image_path: "/b.jpg".to_string(),
                    image_data: None,
                    latitude: Some(10.5),
                    longitude: Some(20.5),
                },
            ]
        );

        store.delete_by_id(1).unwrap();
        let remaining = store.list_all().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 2);
    }

    #[test]
    fn test_empty_path_rejected() {
        let store = store();
        assert!(matches!(store.insert("", None), Err(StoreError::EmptyImagePath)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_dangling_path_is_accepted() {
        let store = store();
        let id = store.insert("/does/not/exist.jpg", None).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().image_path, "/does/not/exist.jpg");
    }

    #[test]
    fn test_unexpected_row_shape_is_storage_error() {
        let store = store();
        store.insert("/a.jpg", None).unwrap();
        store
            .conn
            .execute("INSERT INTO Images (image_path) VALUES (NULL)", [])
            .unwrap();

        assert!(matches!(store.list_all(), Err(StoreError::Storage(_))));
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("imageGallery.db");

        let store = PhotoRecordStore::open(&db_path).unwrap();
        let id = store.insert("/a.jpg", Some(Coordinates::new(1.0, 2.0))).unwrap();
        store.close().unwrap();

        let reopened = PhotoRecordStore::open(&db_path).unwrap();
        let records = reopened.list_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].coordinates(), Some(Coordinates::new(1.0, 2.0)));
        assert_eq!(reopened.path(), db_path.as_path());
    }

    #[test]
    fn test_schema_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("readonly.db");
        std::fs::write(&db_path, b"").unwrap();

        let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY).unwrap();
        let store = PhotoRecordStore { conn, db_path };

        assert!(matches!(store.ensure_schema(), Err(StoreError::Schema(_))));
        assert!(matches!(store.insert("/a.jpg", None), Err(StoreError::Schema(_))));
    }

    #[test]
    fn test_remove_with_file_deletes_both() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.jpg");
        std::fs::write(&image, b"jpeg").unwrap();

        let mut store = store();
        let id = store.insert(image.to_str().unwrap(), None).unwrap();

        let removal = store.remove_with_file(id, |path| std::fs::remove_file(path)).unwrap();

        assert!(matches!(removal, Removal::Removed(ref r) if r.id == id));
        assert!(!image.exists());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_remove_with_missing_file_still_deletes_row() {
        let mut store = store();
        let id = store.insert("/gone/a.jpg", None).unwrap();

        let removal = store.remove_with_file(id, |path| std::fs::remove_file(path)).unwrap();

        assert!(matches!(removal, Removal::FileMissing(_)));
        assert!(store.get(id).unwrap().is_none());
    }

    #[test]
    fn test_remove_rolls_back_when_file_removal_fails() {
        let mut store = store();
        let id = store.insert("/locked/a.jpg", None).unwrap();

        let result = store.remove_with_file(id, |_| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only medium"))
        });

        match result {
            Err(StoreError::FileRemoval { path, source }) => {
                assert_eq!(path, PathBuf::from("/locked/a.jpg"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected FileRemoval, got {:?}", other),
        }
        assert!(store.get(id).unwrap().is_some());
    }

    #[test]
    fn test_file_error_survives_failed_rollback() {
        let err = file_removal_error(
            Err(rusqlite::Error::ExecuteReturnedResults),
            PathBuf::from("/locked/a.jpg"),
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only medium"),
        );

        match err {
            StoreError::FileRemoval { path, source } => {
                assert_eq!(path, PathBuf::from("/locked/a.jpg"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected FileRemoval, got {:?}", other),
        }
    }

    #[test]
    fn test_contains_path() {
        let store = store();
        store.insert("/photos/a.jpg", None).unwrap();

        assert!(store.contains_path("/photos/a.jpg").unwrap());
        assert!(!store.contains_path("/photos/A.jpg").unwrap());
        assert!(!store.contains_path("/photos").unwrap());
    }

    #[test]
    fn test_remove_unknown_id_skips_file() {
        let mut store = store();
        let mut called = false;

        let removal = store
            .remove_with_file(42, |_| {
                called = true;
                Ok(())
            })
            .unwrap();

        assert_eq!(removal, Removal::NoRecord);
        assert!(!called);
    }
}
