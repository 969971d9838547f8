//! Background worker for the photo store
//!
//! rusqlite::Connection is not Sync, and the UI must never wait on disk.
//! One dedicated thread owns the store; everyone else talks to it through a
//! cloneable `StoreHandle`. Commands are served strictly in arrival order.

use std::fs;
use std::thread;
use tokio::sync::{mpsc, oneshot};

use super::data::{Coordinates, PhotoRecord};
use super::store::{PhotoRecordStore, Removal, Result};
use crate::config::GalleryConfig;
use crate::error::StoreError;

/// Commands waiting beyond this make senders wait
const QUEUE_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    Insert {
        image_path: String,
        location: Option<Coordinates>,
        reply: Reply<i64>,
    },
    ListAll {
        reply: Reply<Vec<PhotoRecord>>,
    },
    Get {
        id: i64,
        reply: Reply<Option<PhotoRecord>>,
    },
    ContainsPath {
        image_path: String,
        reply: Reply<bool>,
    },
    Count {
        reply: Reply<i64>,
    },
    Delete {
        id: i64,
        reply: Reply<bool>,
    },
    RemovePhoto {
        id: i64,
        reply: Reply<Removal>,
    },
    Clear {
        reply: Reply<usize>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// Async front for the photo store worker
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<Command>,
}

impl StoreHandle {
    /// Prepare the data directories, open the database and start the worker.
    ///
    /// Opening happens on the calling thread so a broken database is reported
    /// right away instead of on the first request.
    pub fn open(config: &GalleryConfig) -> Result<Self> {
        config.prepare()?;
        let store = PhotoRecordStore::open(config.database_path())?;
        Self::spawn(store)
    }

    /// Move an already opened store onto its own worker thread
    pub fn spawn(store: PhotoRecordStore) -> Result<Self> {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);

        thread::Builder::new()
            .name("photo-store".to_string())
            .spawn(move || run(store, rx))
            .map_err(StoreError::Spawn)?;

        Ok(StoreHandle { tx })
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Closed)?
    }

    pub async fn insert(
        &self,
        image_path: impl Into<String>,
        location: Option<Coordinates>,
    ) -> Result<i64> {
        let image_path = image_path.into();
        self.request(|reply| Command::Insert {
            image_path,
            location,
            reply,
        })
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<PhotoRecord>> {
        self.request(|reply| Command::ListAll { reply }).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<PhotoRecord>> {
        self.request(|reply| Command::Get { id, reply }).await
    }

    pub async fn contains_path(&self, image_path: impl Into<String>) -> Result<bool> {
        let image_path = image_path.into();
        self.request(|reply| Command::ContainsPath { image_path, reply })
            .await
    }

    pub async fn count(&self) -> Result<i64> {
        self.request(|reply| Command::Count { reply }).await
    }

    /// Delete the record only. See `remove_photo` to take the file with it.
    pub async fn delete_by_id(&self, id: i64) -> Result<bool> {
        self.request(|reply| Command::Delete { id, reply }).await
    }

    /// Delete the record and its image file, keeping the record if the file
    /// cannot be removed
    pub async fn remove_photo(&self, id: i64) -> Result<Removal> {
        self.request(|reply| Command::RemovePhoto { id, reply }).await
    }

    pub async fn clear(&self) -> Result<usize> {
        self.request(|reply| Command::Clear { reply }).await
    }

    /// Stop the worker and close the database.
    ///
    /// Commands still queued behind the shutdown fail with `Closed`, as does
    /// every later call on any clone of this handle.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Worker loop. Runs until shutdown is requested or every handle is dropped.
fn run(mut store: PhotoRecordStore, mut rx: mpsc::Receiver<Command>) {
    tracing::debug!("photo store worker started for {}", store.path().display());

    let mut shutdown_reply = None;

    // Send errors only mean the caller stopped waiting
    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::Insert {
                image_path,
                location,
                reply,
            } => {
                let _ = reply.send(store.insert(&image_path, location));
            }
            Command::ListAll { reply } => {
                let _ = reply.send(store.list_all());
            }
            Command::Get { id, reply } => {
                let _ = reply.send(store.get(id));
            }
            Command::ContainsPath { image_path, reply } => {
                let _ = reply.send(store.contains_path(&image_path));
            }
            Command::Count { reply } => {
                let _ = reply.send(store.count());
            }
            Command::Delete { id, reply } => {
                let _ = reply.send(store.delete_by_id(id));
            }
            Command::RemovePhoto { id, reply } => {
                let _ = reply.send(store.remove_with_file(id, |path| fs::remove_file(path)));
            }
            Command::Clear { reply } => {
                let _ = reply.send(store.clear());
            }
            Command::Shutdown { reply } => {
                shutdown_reply = Some(reply);
                break;
            }
        }
    }

    drop(rx);

    let result = store.close();
    match &result {
        Ok(()) => tracing::info!("Photo store closed"),
        Err(err) => tracing::error!("Failed to close photo store: {}", err),
    }

    if let Some(reply) = shutdown_reply {
        let _ = reply.send(result);
    }
}
