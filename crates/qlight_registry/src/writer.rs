//! Serialized snapshot writes
//!
//! One tokio task owns every write of the snapshot file. Mutations only enqueue a
//! command, so request handlers never wait on disk I/O and two writes never overlap.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::RegistryError;
use crate::persistence::{SaveOutcome, SnapshotRepository};
use crate::store::RecordStore;

type Ack = oneshot::Sender<Result<SaveOutcome, String>>;

#[derive(Debug)]
enum WriterCommand {
    /// Persist soon; nobody waits for the result.
    Schedule,
    /// Persist and report back.
    Flush(Ack),
    /// Persist one last time, report back and stop.
    Shutdown(Ack),
}

/// Handle to the snapshot writer task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    tx: mpsc::UnboundedSender<WriterCommand>,
}

impl SnapshotWriter {
    /// Start the writer task. Must be called from within a tokio runtime.
    pub fn spawn(
        store: Arc<RecordStore>,
        repository: Arc<dyn SnapshotRepository>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(rx, store, repository));
        (Self { tx }, handle)
    }

    /// Ask for a write without waiting for it.
    pub fn schedule(&self) -> Result<(), RegistryError> {
        self.tx
            .send(WriterCommand::Schedule)
            .map_err(|_| RegistryError::WriterClosed)
    }

    /// Write the current store contents and wait for the result.
    pub async fn flush(&self) -> Result<SaveOutcome, RegistryError> {
        self.request(WriterCommand::Flush).await
    }

    /// Final write, then stop the task. Later calls fail with `WriterClosed`.
    pub async fn shutdown(&self) -> Result<SaveOutcome, RegistryError> {
        self.request(WriterCommand::Shutdown).await
    }

    async fn request(
        &self,
        command: impl FnOnce(Ack) -> WriterCommand,
    ) -> Result<SaveOutcome, RegistryError> {
        let (ack, reply) = oneshot::channel();
        self.tx
            .send(command(ack))
            .map_err(|_| RegistryError::WriterClosed)?;
        reply
            .await
            .map_err(|_| RegistryError::WriterClosed)?
            .map_err(RegistryError::FlushFailed)
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<WriterCommand>,
    store: Arc<RecordStore>,
    repository: Arc<dyn SnapshotRepository>,
) {
    debug!("snapshot writer started");

    while let Some(first) = rx.recv().await {
        let mut acks = Vec::new();
        let mut stop = false;
        let mut coalesced = 0usize;

        let mut next = Some(first);
        while let Some(command) = next {
            coalesced += 1;
            match command {
                WriterCommand::Schedule => {}
                WriterCommand::Flush(ack) => acks.push(ack),
                WriterCommand::Shutdown(ack) => {
                    acks.push(ack);
                    stop = true;
                }
            }
            next = if stop { None } else { rx.try_recv().ok() };
        }

        let result = write_once(&store, &repository).await;
        match &result {
            Ok(SaveOutcome::Written(count)) => {
                debug!(count, coalesced, "snapshot written")
            }
            Ok(SaveOutcome::Skipped) => debug!(coalesced, "snapshot skipped, registry empty"),
            Err(err) => error!(error = %err, "snapshot write failed"),
        }

        let reply = result.map_err(|err| err.to_string());
        for ack in acks {
            let _ = ack.send(reply.clone());
        }

        if stop {
            break;
        }
    }

    info!("snapshot writer stopped");
}

/// Copy the store and save it on the blocking pool.
async fn write_once(
    store: &Arc<RecordStore>,
    repository: &Arc<dyn SnapshotRepository>,
) -> Result<SaveOutcome, RegistryError> {
    let store = Arc::clone(store);
    let repository = Arc::clone(repository);
    tokio::task::spawn_blocking(move || repository.save_snapshot(&store.all()))
        .await
        .map_err(|err| RegistryError::Task(err.to_string()))?
}
