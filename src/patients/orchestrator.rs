use std::sync::Arc;

use rusqlite::Connection;
use serde::Serialize;

use super::PatientError;
use crate::db::repository::{
    count_patients, count_stroke_patients, delete_patient, enqueue_mirror_event, get_patient,
    insert_patient, list_patients, update_patient,
};
use crate::mirror::{MirrorRelay, MirrorSync, PatientDocument};
use crate::models::enums::MirrorOp;
use crate::models::{Patient, PatientInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_patients: u64,
    pub stroke_count: u64,
}

/// Applies patient mutations to the record store, then the mirror.
///
/// The row write and its outbox event commit together. The mirror write
/// that follows is best effort: a failure is logged and the relay retries
/// it, the caller still gets the committed patient.
#[derive(Clone)]
pub struct PatientService {
    relay: Arc<MirrorRelay>,
}

impl PatientService {
    pub fn new(relay: Arc<MirrorRelay>) -> Self {
        Self { relay }
    }

    pub fn create(&self, conn: &Connection, input: &PatientInput) -> Result<Patient, PatientError> {
        let fields = input.validate()?;

        let tx = conn.unchecked_transaction()?;
        let id = insert_patient(&tx, &fields)?;
        let patient = get_patient(&tx, id)?.ok_or(PatientError::NotFound(id))?;
        let payload = serde_json::to_string(&PatientDocument::from(&patient))?;
        enqueue_mirror_event(&tx, id, MirrorOp::Upsert, Some(&payload))?;
        tx.commit()?;

        tracing::info!(patient_id = id, stroke = ?patient.stroke, "Patient created");
        self.mirror(conn, id);
        Ok(patient)
    }

    /// Overwrite every field of an existing patient.
    pub fn update(
        &self,
        conn: &Connection,
        id: i64,
        input: &PatientInput,
    ) -> Result<Patient, PatientError> {
        let fields = input.validate()?;

        let tx = conn.unchecked_transaction()?;
        update_patient(&tx, id, &fields)?;
        let patient = get_patient(&tx, id)?.ok_or(PatientError::NotFound(id))?;
        let payload = serde_json::to_string(&PatientDocument::from(&patient))?;
        enqueue_mirror_event(&tx, id, MirrorOp::Upsert, Some(&payload))?;
        tx.commit()?;

        tracing::info!(patient_id = id, "Patient updated");
        self.mirror(conn, id);
        Ok(patient)
    }

    pub fn delete(&self, conn: &Connection, id: i64) -> Result<(), PatientError> {
        let tx = conn.unchecked_transaction()?;
        delete_patient(&tx, id)?;
        enqueue_mirror_event(&tx, id, MirrorOp::Delete, None)?;
        tx.commit()?;

        tracing::info!(patient_id = id, "Patient deleted");
        self.mirror(conn, id);
        Ok(())
    }

    pub fn get(&self, conn: &Connection, id: i64) -> Result<Patient, PatientError> {
        get_patient(conn, id)?.ok_or(PatientError::NotFound(id))
    }

    pub fn list(&self, conn: &Connection) -> Result<Vec<Patient>, PatientError> {
        Ok(list_patients(conn)?)
    }

    pub fn stats(&self, conn: &Connection) -> Result<DashboardStats, PatientError> {
        Ok(DashboardStats {
            total_patients: count_patients(conn)?,
            stroke_count: count_stroke_patients(conn)?,
        })
    }

    /// Best-effort immediate mirror write after commit.
    fn mirror(&self, conn: &Connection, id: i64) {
        match self.relay.sync_patient(conn, id) {
            Ok(MirrorSync::Synced) => {}
            Ok(MirrorSync::Pending { error }) => {
                tracing::warn!(patient_id = id, %error, "Mirror behind record store, relay will retry");
            }
            Ok(MirrorSync::Parked { error }) => {
                tracing::warn!(patient_id = id, %error, "Mirror event parked");
            }
            Err(e) => {
                tracing::warn!(patient_id = id, error = %e, "Mirror sync skipped");
            }
        }
    }
}
