//! The device registry
//!
//! [`DeviceRegistry`] ties the in-memory store to the snapshot writer. It is built once
//! by the binary and shared with the HTTP layer through an `Arc`.

use std::sync::Arc;

use qlight_common::{qualify_query, QueryRejection};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::models::{now_utc, CheckIn, DeviceRecord};
use crate::persistence::{load_or_empty, SaveOutcome, SnapshotRepository};
use crate::resolver::{self, subnet_prefix, Resolution};
use crate::store::RecordStore;
use crate::writer::SnapshotWriter;

/// Whether a check-in created a record or updated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInOutcome {
    Created,
    Updated,
}

impl CheckInOutcome {
    /// Text sent back to the device after `OK:`.
    pub fn status_text(&self) -> &'static str {
        match self {
            CheckInOutcome::Created => "New Entry",
            CheckInOutcome::Updated => "Updated Entry",
        }
    }
}

#[derive(Debug)]
pub struct DeviceRegistry {
    store: Arc<RecordStore>,
    writer: SnapshotWriter,
}

impl DeviceRegistry {
    /// Load the snapshot and start the writer task.
    ///
    /// An unreadable snapshot is logged and the registry starts empty. The returned
    /// handle completes after [`DeviceRegistry::shutdown`].
    pub fn open(repository: Arc<dyn SnapshotRepository>) -> (Self, JoinHandle<()>) {
        let store = Arc::new(RecordStore::new());
        let count = store.hydrate(load_or_empty(repository.as_ref()));
        info!(count, "device registry ready");

        let (writer, handle) = SnapshotWriter::spawn(Arc::clone(&store), repository);
        (Self { store, writer }, handle)
    }

    /// Create-or-update a device and schedule a snapshot write.
    pub fn check_in(&self, candidate: CheckIn) -> (DeviceRecord, CheckInOutcome) {
        let (record, created) = self.store.upsert(candidate, now_utc());
        self.schedule_write();
        let outcome = if created {
            CheckInOutcome::Created
        } else {
            CheckInOutcome::Updated
        };
        (record, outcome)
    }

    /// Apply a check-in to a known device only. Returns `None` for an unknown ID.
    pub fn update_existing(&self, candidate: CheckIn) -> Option<DeviceRecord> {
        let record = self.store.update_existing(candidate, now_utc())?;
        self.schedule_write();
        Some(record)
    }

    pub fn get(&self, id: &str) -> Option<DeviceRecord> {
        self.store.get(id)
    }

    pub fn all(&self) -> Vec<DeviceRecord> {
        self.store.all()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Find a controller on the requester's LAN.
    ///
    /// `private_ip` is validated before anything else. When `requester_id` names a known
    /// device and `private_ip` has fewer than three octets, the device's last recorded
    /// private IP is used instead.
    pub fn resolve(
        &self,
        public_ip: &str,
        private_ip: &str,
        requester_id: Option<&str>,
    ) -> Result<Resolution, QueryRejection> {
        qualify_query(private_ip)?;
        if let Some(id) = requester_id {
            qualify_query(id)?;
        }

        let fallback = match requester_id {
            Some(id) if subnet_prefix(private_ip).is_none() => self
                .store
                .get(id)
                .map(|record| record.last_private_ip)
                .filter(|stored| subnet_prefix(stored).is_some()),
            _ => None,
        };
        let effective = fallback.as_deref().unwrap_or(private_ip);

        self.store
            .scan(|records| resolver::resolve(records, public_ip, effective))
    }

    /// Write the snapshot now and wait for it.
    pub async fn flush(&self) -> Result<SaveOutcome, RegistryError> {
        self.writer.flush().await
    }

    /// Final write; stops the writer task.
    pub async fn shutdown(&self) -> Result<SaveOutcome, RegistryError> {
        let outcome = self.writer.shutdown().await?;
        info!(count = self.store.len(), "device registry closed");
        Ok(outcome)
    }

    fn schedule_write(&self) {
        if let Err(err) = self.writer.schedule() {
            warn!(error = %err, "snapshot write not scheduled");
        }
    }
}
