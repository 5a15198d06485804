mod conflict;
mod error;
mod mutations;
mod queries;
mod store;

pub use error::{EngineError, ErrorKind};
pub use mutations::{CreateReservation, NewEnrollee, ProfilePatch, ReservationPatch};
pub use store::ClubState;

use std::io;
use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot, RwLock};

use crate::model::Event;
use crate::wal::Wal;

/// Deployment knobs. The midnight rule is deliberately a policy, not a hard
/// rule: one deployment rejects bookings running past 24:00, another allows
/// them.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    pub reject_midnight_crossing: bool,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            reject_midnight_crossing: true,
        }
    }
}

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task owning the WAL. Batches whatever appends are immediately
/// available into a single fsync (group commit), then acks all of them.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let WalCommand::Append { event, response } = cmd else {
            handle_non_append(&mut wal, cmd);
            continue;
        };

        let mut batch = vec![(event, response)];
        let mut deferred = None;
        loop {
            match rx.try_recv() {
                Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                Ok(other) => {
                    // Flush what we have before serving the non-append.
                    deferred = Some(other);
                    break;
                }
                Err(_) => break, // channel drained
            }
        }

        metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
            .record(batch.len() as f64);
        let flush_start = std::time::Instant::now();
        let result = flush_batch(&mut wal, &batch);
        metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
            .record(flush_start.elapsed().as_secs_f64());

        for (_, tx) in batch {
            let _ = tx.send(match &result {
                Ok(()) => Ok(()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            });
        }
        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush so partially buffered bytes don't leak into the next
    // batch (every caller in this batch is told it failed).
    let flush_err = wal.flush_sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// The booking engine: the club's state behind one lock, with every mutation
/// WAL-appended before it is applied.
///
/// One lock is the point, not a shortcut. Room conflicts, personal-schedule
/// clashes, and capacity counts are check-then-act sequences that cut across
/// rooms and people; holding the write lock from check to write is what makes
/// each operation a single atomic unit.
pub struct Engine {
    pub(super) state: RwLock<ClubState>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub(super) policy: BookingPolicy,
}

impl Engine {
    /// Replay the WAL at `wal_path` (created if missing) and start the
    /// background WAL writer.
    pub fn open(wal_path: PathBuf, policy: BookingPolicy) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let state = ClubState::from_events(&events);
        tracing::info!(
            events = events.len(),
            enrollees = state.enrollees.len(),
            rooms = state.rooms.len(),
            reservations = state.reservations.len(),
            "engine opened from {}",
            wal_path.display()
        );

        Ok(Self {
            state: RwLock::new(state),
            wal_tx,
            policy,
        })
    }

    /// Write an event through the group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::Wal(e.to_string()))
    }

    /// Durably append, then apply. Caller holds the write lock, so nothing
    /// observes the state between the validation that produced `event` and
    /// its application.
    pub(super) async fn persist_and_apply(
        &self,
        state: &mut ClubState,
        event: Event,
    ) -> Result<(), EngineError> {
        self.wal_append(&event).await?;
        state.apply(&event);
        Ok(())
    }

    /// Rewrite the WAL with the minimal event stream recreating current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let events = self.state.read().await.snapshot_events();
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::Wal(e.to_string()))
    }

    /// Appends since the last compaction, for the compactor's threshold.
    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
