//! Outbox relay: applies pending mirror events to the [`MirrorStore`].
//!
//! Events are applied oldest first. A failing event is left in the outbox
//! with its attempt count bumped and the pass stops there, so a later
//! event for the same patient can never overtake an earlier one.
//!
//! An event that can never succeed (no payload, undecodable payload) or that
//! has failed [`MAX_MIRROR_ATTEMPTS`] times is parked instead, and the pass
//! moves on. [`MirrorRelay::requeue_parked`] replaces parked events with
//! fresh ones built from the current record-store state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::types::{MirrorStore, PatientDocument};
use super::MirrorError;
use crate::config::MAX_MIRROR_ATTEMPTS;
use crate::db::repository::{
    complete_mirror_event, discard_parked_mirror_events, enqueue_mirror_event, get_patient,
    list_patients, park_mirror_event, parked_mirror_sql_ids, pending_mirror_events,
    pending_mirror_events_for, record_mirror_failure, MirrorEvent,
};
use crate::db::{open_database, DatabaseError};
use crate::models::enums::MirrorOp;

/// Outcome of an immediate mirror attempt for one patient.
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorSync {
    /// Every pending event for the patient reached the mirror.
    Synced,
    /// At least one event is still queued; the background relay retries it.
    Pending { error: String },
    /// An event was parked and waits for `sync-mirror --requeue-parked`.
    Parked { error: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub applied: usize,
    pub failed: usize,
    pub parked: usize,
}

#[derive(Debug, Default)]
struct Pass {
    applied: usize,
    parked: usize,
    last_parked: Option<String>,
    stopped_on: Option<String>,
}

pub struct MirrorRelay {
    mirror: Arc<dyn MirrorStore>,
    drain_lock: Mutex<()>,
}

impl MirrorRelay {
    pub fn new(mirror: Arc<dyn MirrorStore>) -> Self {
        Self {
            mirror,
            drain_lock: Mutex::new(()),
        }
    }

    /// Try to apply the pending events of a single patient right away.
    ///
    /// Called after a committed mutation. Failures are logged and left in
    /// the outbox; only record-store errors are returned.
    pub fn sync_patient(&self, conn: &Connection, sql_id: i64) -> Result<MirrorSync, DatabaseError> {
        let _guard = self.drain_lock.lock().unwrap_or_else(|e| e.into_inner());
        let events = pending_mirror_events_for(conn, sql_id)?;
        let pass = self.apply_in_order(conn, &events)?;
        Ok(match (pass.stopped_on, pass.last_parked) {
            (Some(error), _) => MirrorSync::Pending { error },
            (None, Some(error)) => MirrorSync::Parked { error },
            (None, None) => MirrorSync::Synced,
        })
    }

    /// Apply up to `limit` pending events across all patients.
    pub fn drain(&self, conn: &Connection, limit: usize) -> Result<DrainReport, DatabaseError> {
        let _guard = self.drain_lock.lock().unwrap_or_else(|e| e.into_inner());
        let events = pending_mirror_events(conn, limit)?;
        let pass = self.apply_in_order(conn, &events)?;
        let report = DrainReport {
            applied: pass.applied,
            failed: usize::from(pass.stopped_on.is_some()),
            parked: pass.parked,
        };
        if report != DrainReport::default() {
            tracing::info!(
                applied = report.applied,
                failed = report.failed,
                parked = report.parked,
                "Mirror outbox drained"
            );
        }
        Ok(report)
    }

    /// Queue an upsert for every record-store row.
    ///
    /// Reconciles a mirror that never saw rows written outside the
    /// orchestrator (CSV import) or that was wiped.
    pub fn rebuild(&self, conn: &Connection) -> Result<usize, MirrorError> {
        let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
        let patients = list_patients(&tx)?;
        for patient in &patients {
            let payload = serde_json::to_string(&PatientDocument::from(patient))?;
            enqueue_mirror_event(&tx, patient.id, MirrorOp::Upsert, Some(&payload))?;
        }
        tx.commit().map_err(DatabaseError::from)?;
        tracing::info!(count = patients.len(), "Mirror rebuild queued");
        Ok(patients.len())
    }

    /// Replace every parked event with one that reflects the row as it is
    /// now: an upsert if it still exists, a delete otherwise.
    pub fn requeue_parked(&self, conn: &Connection) -> Result<usize, MirrorError> {
        let _guard = self.drain_lock.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
        let ids = parked_mirror_sql_ids(&tx)?;
        discard_parked_mirror_events(&tx)?;
        for &sql_id in &ids {
            match get_patient(&tx, sql_id)? {
                Some(patient) => {
                    let payload = serde_json::to_string(&PatientDocument::from(&patient))?;
                    enqueue_mirror_event(&tx, sql_id, MirrorOp::Upsert, Some(&payload))?;
                }
                None => {
                    enqueue_mirror_event(&tx, sql_id, MirrorOp::Delete, None)?;
                }
            }
        }
        tx.commit().map_err(DatabaseError::from)?;
        if !ids.is_empty() {
            tracing::info!(count = ids.len(), "Parked mirror events requeued");
        }
        Ok(ids.len())
    }

    fn apply_in_order(
        &self,
        conn: &Connection,
        events: &[MirrorEvent],
    ) -> Result<Pass, DatabaseError> {
        let mut pass = Pass::default();
        for event in events {
            let err = match self.apply(event) {
                Ok(()) => {
                    complete_mirror_event(conn, event.id)?;
                    pass.applied += 1;
                    continue;
                }
                Err(e) => e,
            };

            let reason = err.to_string();
            let attempts = event.attempts + 1;
            record_mirror_failure(conn, event.id, &reason)?;

            if err.is_permanent() || attempts >= MAX_MIRROR_ATTEMPTS {
                park_mirror_event(conn, event.id)?;
                tracing::warn!(
                    event_id = event.id,
                    sql_id = event.sql_id,
                    op = %event.op,
                    attempts,
                    error = %reason,
                    "Mirror event parked, run `sync-mirror --requeue-parked` to retry"
                );
                pass.parked += 1;
                pass.last_parked = Some(reason);
                continue;
            }

            tracing::warn!(
                event_id = event.id,
                sql_id = event.sql_id,
                op = %event.op,
                attempts,
                error = %reason,
                "Mirror write failed, event left in outbox"
            );
            pass.stopped_on = Some(reason);
            break;
        }
        Ok(pass)
    }

    fn apply(&self, event: &MirrorEvent) -> Result<(), MirrorError> {
        match event.op {
            MirrorOp::Upsert => {
                let payload = event
                    .payload
                    .as_deref()
                    .ok_or(MirrorError::MissingPayload { event_id: event.id })?;
                let doc: PatientDocument = serde_json::from_str(payload)?;
                self.mirror
                    .upsert(&doc)
                    .map_err(|e| write_failure(event.sql_id, e))
            }
            MirrorOp::Delete => {
                let removed = self
                    .mirror
                    .delete_by_sql_id(event.sql_id)
                    .map_err(|e| write_failure(event.sql_id, e))?;
                if !removed {
                    tracing::debug!(sql_id = event.sql_id, "Mirror document already absent");
                }
                Ok(())
            }
        }
    }
}

fn write_failure(sql_id: i64, err: MirrorError) -> MirrorError {
    MirrorError::WriteFailure {
        sql_id,
        reason: err.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════
// Background task
// ═══════════════════════════════════════════════════════════

/// Handle to the periodic relay task.
pub struct RelayTask {
    handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RelayTask {
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

/// Drain the outbox every `interval`, `batch` events at a time.
pub fn spawn_relay(
    relay: Arc<MirrorRelay>,
    records_db: PathBuf,
    interval: Duration,
    batch: usize,
) -> RelayTask {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        tracing::info!(interval_secs = interval.as_secs(), batch, "Mirror relay started");
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    let relay = relay.clone();
                    let path = records_db.clone();
                    let pass = tokio::task::spawn_blocking(move || {
                        let conn = open_database(&path)?;
                        relay.drain(&conn, batch)
                    })
                    .await;
                    match pass {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::error!(error = %e, "Mirror relay pass failed"),
                        Err(e) => tracing::error!(error = %e, "Mirror relay task panicked"),
                    }
                }
            }
        }
        tracing::info!("Mirror relay stopped");
    });

    RelayTask {
        handle,
        shutdown_tx: Some(shutdown_tx),
    }
}
